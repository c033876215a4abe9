//! Backup and restore of the local job database through a [`Storage`].
//!
//! - [`BackupCoordinator`] - Digest-gated upload, atomic startup restore
//! - [`MemoryStorage`] - In-process object store
//! - [`LocalDirStorage`] - A directory used as an object store
//!
//! [`Storage`]: cronkeep_protocols::Storage

mod coordinator;
mod error;
mod local;
mod memory;

pub use coordinator::{
    checksum_marker_path, file_checksum, BackupCoordinator, BackupOutcome, RestoreOutcome,
    CHECKSUM_MARKER,
};
pub use error::BackupError;
pub use local::LocalDirStorage;
pub use memory::MemoryStorage;
