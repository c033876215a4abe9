//! Runtime errors.

use cronkeep_backup::BackupError;
use cronkeep_protocols::JobError;
use cronkeep_store::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Job(#[from] JobError),

    /// A sync interval of zero.
    #[error("Invalid sync interval: {0}")]
    InvalidInterval(String),
}
