//! SQLite persistence for cronkeep.
//!
//! Upserts the whole registry in one transaction and reloads it through the
//! registry's normal add path, so triggers are rebuilt on every load.

mod error;
mod schema;
mod store;

pub use error::PersistenceError;
pub use store::{LoadReport, SqliteJobStore};
