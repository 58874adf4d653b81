use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session directory does not exist: {}", .0.display())]
    MissingSession(PathBuf),

    #[error("mapper file does not exist: {}", .0.display())]
    MissingMapper(PathBuf),

    #[error("unreadable asset {}: {reason}", path.display())]
    UnreadableAsset { path: PathBuf, reason: String },

    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("worker pool error: {0}")]
    Pool(String),
}

impl Error {
    /// Build an [`Error::UnreadableAsset`] from any displayable cause.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::UnreadableAsset {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
