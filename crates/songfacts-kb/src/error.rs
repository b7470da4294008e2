//! Error types for the fact store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading, saving or querying a fact store.
#[derive(Debug, Error)]
pub enum KbError {
    /// The fact store document does not exist.
    #[error("fact store not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The fact store document is not valid JSON (or not the expected shape).
    #[error("malformed fact store {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing a file failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed outside of a file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A query argument was rejected before lookup.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl KbError {
    /// Classify an IO error raised while reading `path`.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            KbError::NotFound { path }
        } else {
            KbError::Io { path, source }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KbError::Io {
            path: path.into(),
            source,
        }
    }
}
