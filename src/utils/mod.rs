pub mod app_config;
pub mod constants;
pub mod errors;
pub mod helpers;
pub mod logger;

pub use app_config::AppConfig;
pub use constants::*;
pub use errors::{DefinitionError, Result, StackError};
pub use helpers::*;
