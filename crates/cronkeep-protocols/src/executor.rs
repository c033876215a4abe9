//! Job executor protocol definitions.
//!
//! Executors validate a job's config at admission time and perform the
//! type-specific action when the job fires.

use async_trait::async_trait;

use crate::error::JobError;
use crate::job::{JobConfig, JobType};

/// Core trait for job executors.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// The job type this executor handles.
    fn job_type(&self) -> JobType;

    /// Keys that must be present in the config.
    fn required_keys(&self) -> &'static [&'static str] {
        self.job_type().required_keys()
    }

    /// Check the config. Pure, no side effects.
    fn validate(&self, config: &JobConfig) -> Result<(), JobError> {
        for key in self.required_keys() {
            if !config.contains_key(*key) {
                return Err(JobError::missing_key(key));
            }
        }
        Ok(())
    }

    /// Perform the job's action.
    async fn execute(&self, config: &JobConfig) -> Result<(), JobError>;
}

/// Read a string value out of a job config.
pub fn config_str<'a>(config: &'a JobConfig, key: &str) -> Result<&'a str, JobError> {
    match config.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(JobError::Execution(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
        None => Err(JobError::Execution(format!("'{}' is missing", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopExecutor;

    #[async_trait]
    impl JobExecutor for NoopExecutor {
        fn job_type(&self) -> JobType {
            JobType::Sync
        }

        async fn execute(&self, _config: &JobConfig) -> Result<(), JobError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_validate() {
        let mut config = JobConfig::new();
        config.insert("source".to_string(), serde_json::json!("/a"));

        let err = NoopExecutor.validate(&config).unwrap_err();
        assert!(err.to_string().contains("destination"));

        config.insert("destination".to_string(), serde_json::json!("/b"));
        assert!(NoopExecutor.validate(&config).is_ok());
    }

    #[test]
    fn test_config_str() {
        let mut config = JobConfig::new();
        config.insert("to".to_string(), serde_json::json!("ops@example.com"));
        config.insert("retries".to_string(), serde_json::json!(3));

        assert_eq!(config_str(&config, "to").unwrap(), "ops@example.com");
        assert!(config_str(&config, "retries").is_err());
        assert!(config_str(&config, "subject").is_err());
    }

    #[tokio::test]
    async fn test_execute() {
        assert!(NoopExecutor.execute(&JobConfig::new()).await.is_ok());
    }
}
