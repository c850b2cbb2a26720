use crate::EntryKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to list {}: {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} -> {}: {source}", source_path.display(), target.display())]
    Copy {
        source_path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Type conflict: {} is a {source_kind} but {} is a {target_kind}",
        source_path.display(),
        target.display()
    )]
    Conflict {
        source_path: PathBuf,
        source_kind: EntryKind,
        target: PathBuf,
        target_kind: EntryKind,
    },

    #[error("Invalid exclusion pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{} operation(s) failed, first: {}", .0.len(), first_failure(.0))]
    Incomplete(Vec<SyncError>),
}

pub type Result<T> = std::result::Result<T, SyncError>;

fn first_failure(errors: &[SyncError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}
