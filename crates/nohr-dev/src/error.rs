use std::path::PathBuf;

use nohr_router::RouterError;
use thiserror::Error;

use crate::bundler::BuildTarget;

pub type Result<T> = std::result::Result<T, DevError>;

#[derive(Debug, Error)]
pub enum DevError {
    /// A bundler run failed; the coordinator reports it to clients and keeps going
    #[error("{target} build failed: {message}")]
    Build { target: BuildTarget, message: String },

    #[error("failed to start `{command}`: {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("route discovery failed: {0}")]
    Routes(#[from] RouterError),

    #[error("update channel connection failed: {0}")]
    Connection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
