//! Error types for the cronkeep protocol layer.

mod job;
mod storage;

pub use job::*;
pub use storage::*;
