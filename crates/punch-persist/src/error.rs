use std::io;
use std::path::PathBuf;

/// Errors produced by the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The write queue has begun shutting down and accepts no new work.
    #[error("write queue is stopping")]
    QueueStopping,

    /// The worker thread is gone without the queue having been stopped.
    #[error("write queue worker exited unexpectedly")]
    WorkerClosed,

    /// The worker thread could not be started.
    #[error("failed to spawn write queue worker: {0}")]
    WorkerSpawn(#[source] io::Error),

    /// A persisted record file cannot be turned back into a record.
    #[error("database corrupted: {}: {reason}", path.display())]
    DatabaseCorrupted { path: PathBuf, reason: String },

    /// I/O error from the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistError>;
