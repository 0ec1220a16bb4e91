use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the safe-mutation subsystem.
#[derive(Error, Debug)]
pub enum Error {
    /// Target file is held open by another process
    #[error("file is in use by another process: {}", path.display())]
    FileLocked { path: PathBuf },
    /// A backup already exists; creating another would lose the original
    #[error("backup already exists for '{}'", path.display())]
    AlreadyBackedUp { path: PathBuf },
    /// Restore requested but there is nothing to restore from
    #[error("no backup found for '{}'", path.display())]
    NoBackupFound { path: PathBuf },
    #[error("backup failed for '{}': {reason}", path.display())]
    BackupFailed { path: PathBuf, reason: String },
    #[error("restore failed for '{}': {reason}", path.display())]
    RestoreFailed { path: PathBuf, reason: String },
    /// Copied bytes do not match the source
    #[error("integrity check failed for '{}': expected hash {expected}, got {actual}", path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    /// A batch failed and some of its files could not be put back
    #[error("{cause}; rollback failed for {} file(s)", failed.len())]
    RollbackFailed {
        #[source]
        cause: Box<Error>,
        failed: Vec<PathBuf>,
    },
    /// Another copy of this program holds the instance lock
    #[error("another instance is already running")]
    SecondInstance,
    #[error("operation canceled")]
    Canceled,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
