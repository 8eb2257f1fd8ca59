use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileGroupsError {
    #[error("Unknown group: {id}")]
    GroupNotFound { id: String },

    #[error("Unknown entry: {name}")]
    EntryNotFound { name: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Directory is not accessible: {path}")]
    DirectoryInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write sidecar at {path}: {message}")]
    PersistenceWriteFailed { path: PathBuf, message: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FileGroupsError>;
