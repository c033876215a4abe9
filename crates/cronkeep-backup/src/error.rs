//! Backup errors.

use cronkeep_protocols::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Local file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
