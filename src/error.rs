//! Error types for storage engines and the persistence pipeline

use thiserror::Error;

/// Errors returned by a [`StorageEngine`](crate::platform::StorageEngine)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-key failures of the hydrate/persist pipeline.
///
/// None of these ever escape the plugin: they are logged and the affected
/// key falls back to its in-memory value.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to read `{key}` from storage: {source}")]
    Read {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to deserialize `{key}`: {reason}")]
    Deserialize { key: String, reason: String },

    #[error("Migration of `{key}` at version {version} failed: {reason}")]
    Migration {
        key: String,
        version: String,
        reason: String,
    },

    #[error("Failed to serialize `{key}`: {reason}")]
    Serialize { key: String, reason: String },

    #[error("Failed to write `{key}` to storage: {source}")]
    Write {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl PersistError {
    /// The state key the failure belongs to
    pub fn key(&self) -> &str {
        match self {
            PersistError::Read { key, .. }
            | PersistError::Deserialize { key, .. }
            | PersistError::Migration { key, .. }
            | PersistError::Serialize { key, .. }
            | PersistError::Write { key, .. } => key,
        }
    }
}
