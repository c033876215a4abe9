//! # cronkeep Runtime
//!
//! Wires the registry, the SQLite store and the backup coordinator into a
//! service with an orderly start and stop:
//!
//! - [`CronService`] - Restore, load, schedule, sync, final save
//! - [`SyncLoop`] - The single background task running save and backup ticks

mod error;
mod service;
mod sync;

pub use error::RuntimeError;
pub use service::CronService;
pub use sync::{SyncLoop, SyncState};
