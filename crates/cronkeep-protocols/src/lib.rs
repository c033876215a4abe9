//! # cronkeep Protocols
//!
//! Shared data model and capability traits for the cronkeep workspace.
//! Contains only definitions - no scheduling or persistence logic.
//!
//! ## Core Items
//!
//! - [`Job`] / [`JobType`] - The schedulable unit of work
//! - [`JobExecutor`] - Validate/execute capability per job type
//! - [`Storage`] - Remote object store capability consumed by backups

pub mod error;
pub mod executor;
pub mod job;
pub mod storage;

pub use error::{JobError, StorageError};
pub use executor::{config_str, JobExecutor};
pub use job::{EntryId, Job, JobConfig, JobType};
pub use storage::{stream_from_bytes, ByteStream, FileInfo, Storage};
