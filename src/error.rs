//! Error types for Scuba

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScubaError {
    #[error("Error loading {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Schema(String),

    #[error("Invalid !from_yaml reference: {0}")]
    Reference(String),

    #[error("Invalid script: {0}")]
    ScriptFormat(String),

    #[error("Top-level 'image' not set")]
    MissingImage,

    #[error("Unknown alias: {0}")]
    UnknownAlias(String),

    #[error("{0}")]
    ConfigNotFound(String),

    #[error("{0}")]
    Build(String),

    #[error("Failed to execute docker. Is it installed?")]
    DockerExecute(#[source] std::io::Error),

    #[error("Docker error: {0}")]
    Docker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScubaError {
    /// Exit status reported by the `scuba` binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScubaError::DockerExecute(_) => 2,
            _ => 128,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScubaError>;
