//! Packaging error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::integrity::IntegrityError;

/// Errors that abort a packaging run.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Path creation, read or write failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed bundle or dependency archive.
    #[error("failed to extract {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// Download failure or non-success status.
    #[error("failed to download {url}: {reason}")]
    Network { url: String, reason: String },

    /// Downloaded content did not match its pinned hash.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Archive construction failure or missing required members.
    #[error("failed to build {artifact}: {reason}")]
    Packaging { artifact: String, reason: String },

    /// A precondition on the filesystem did not hold.
    #[error("invalid state at {path}: {reason}")]
    InvalidState { path: PathBuf, reason: String },

    /// Settings do not fit their document model or could not be serialized.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// Packager configuration is incomplete or unreadable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Workspace removal failed. Logged, never fatal to a run.
    #[error("failed to remove workspace {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    /// Build a mapper from `io::Error` to [`PackageError::Io`] for `path`.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PackageError::Io { path, source }
    }

    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PackageError::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn packaging(artifact: impl Into<String>, reason: impl ToString) -> Self {
        PackageError::Packaging {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for packaging operations.
pub type Result<T> = std::result::Result<T, PackageError>;
