use std::path::PathBuf;

use thiserror::Error;

use crate::route::PatternError;

pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors raised while discovering routes or persisting the manifest
#[derive(Debug, Error)]
pub enum RouterError {
    /// A filesystem error other than a missing scan root
    #[error("route discovery failed at {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid route {}: {reason}", path.display())]
    InvalidRoute {
        path: PathBuf,
        #[source]
        reason: PatternError,
    },

    #[error("route manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RouterError {
    pub(crate) fn discovery(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Discovery {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn manifest(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Manifest {
            path: path.into(),
            source: source.into(),
        }
    }
}
