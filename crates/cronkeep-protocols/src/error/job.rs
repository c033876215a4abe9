//! Job registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    /// Unknown job type or a config missing a type-required key.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid cron expression '{expression}': {message}")]
    Schedule { expression: String, message: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl JobError {
    pub fn missing_key(key: &str) -> Self {
        JobError::Validation(format!("'{}' field is required", key))
    }

    pub fn schedule(expression: impl Into<String>, message: impl ToString) -> Self {
        JobError::Schedule {
            expression: expression.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound(_))
    }
}
