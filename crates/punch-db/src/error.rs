use std::io;

use punch_persist::PersistError;
use punch_store::StoreError;

/// Errors surfaced by the database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No collection was registered under this name.
    #[error("unknown collection: {name}")]
    UnknownCollection { name: String },

    /// The collection exists but stores a different record type.
    #[error("collection {name} stores {actual}, not {requested}")]
    CollectionTypeMismatch {
        name: String,
        requested: &'static str,
        actual: &'static str,
    },

    /// The same collection name was registered twice.
    #[error("collection registered twice: {name}")]
    DuplicateCollection { name: String },

    /// The collection name cannot be used as a directory name.
    #[error("invalid collection name: {0}")]
    InvalidCollectionName(String),

    /// The configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Duplicate or missing record inside a mutation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Corrupted files, a stopping write queue, or other persistence trouble.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// I/O error outside the record files themselves.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DbError {
    /// Returns `true` if this error reports an unreadable record file.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Persist(PersistError::DatabaseCorrupted { .. })
        )
    }
}

/// Result alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
