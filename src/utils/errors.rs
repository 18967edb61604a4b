//! Error types for the backup and restore pipelines.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::command::CommandError;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Archive {} not found", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Backup archive {} is empty", .0.display())]
    EmptyArchive(PathBuf),

    #[error("Backup archive {} has no top-level directory", .0.display())]
    NoContentDirectory(PathBuf),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl StackError {
    /// Build a `map_err` adapter that attaches `context` to an I/O failure
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> StackError {
        let context = context.into();
        move |source| StackError::Io { context, source }
    }
}

/// Reasons a resolved service definition could not be read
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("invalid service definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("service definition is not a mapping")]
    NotMapping,

    #[error("`volumes` section is not a mapping")]
    VolumesNotMapping,
}

pub type Result<T> = std::result::Result<T, StackError>;
