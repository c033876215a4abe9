//! Persistence errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Opening the file, creating the schema or running a statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A row could not be turned back into an admitted job.
    #[error("Failed to load job '{id}': {message}")]
    Decode { id: String, message: String },

    /// Some rows were skipped during a load.
    #[error("Loaded {loaded} jobs, {failed} failed (first: {first})")]
    PartialLoad {
        loaded: usize,
        failed: usize,
        first: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    pub fn decode(id: impl Into<String>, message: impl ToString) -> Self {
        PersistenceError::Decode {
            id: id.into(),
            message: message.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error> for PersistenceError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error() {
        let err = PersistenceError::decode("job-1", "bad config");
        let display = err.to_string();
        assert!(display.contains("job-1"));
        assert!(display.contains("bad config"));
    }

    #[test]
    fn test_partial_load_error() {
        let err = PersistenceError::PartialLoad {
            loaded: 3,
            failed: 1,
            first: "job-9".to_string(),
        };
        assert!(err.to_string().contains("3"));
        assert!(err.to_string().contains("job-9"));
    }
}
