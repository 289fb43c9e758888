// src/store/error.rs
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("recording not found: {0}")]
    NotFound(String),
    #[error("malformed recording header: {0}")]
    Malformed(String),
    #[error("recording contains no samples")]
    Empty,
    #[error("loading aborted: {0}")]
    Aborted(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LoadError::Malformed(msg.into())
    }

    /// Map a filesystem error, folding a missing file into `NotFound`.
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.display().to_string())
        } else {
            LoadError::Io { path, source }
        }
    }
}
