pub mod archive;
pub mod backup;
pub mod command;
pub mod config;
pub mod docker;
pub mod maintenance;
pub mod restore;
pub mod volumes;

pub use backup::{list_backups, BackupEntry, BackupManager};
pub use command::{Cmd, CommandError, CommandRunner, ProcessRunner};
pub use config::StackConfig;
pub use docker::DockerManager;
pub use maintenance::MaintenanceManager;
pub use restore::{RestoreManager, RestoreReport, VolumeSource};
