//! Built-in job executors and the type-keyed dispatch table.

mod backup;
mod custom;
mod email;
mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use cronkeep_protocols::{JobConfig, JobError, JobExecutor, JobType};

pub use backup::BackupExecutor;
pub use custom::CustomExecutor;
pub use email::EmailExecutor;
pub use sync::SyncExecutor;

/// Dispatch table from job type to executor.
#[derive(Clone)]
pub struct ExecutorSet {
    executors: HashMap<JobType, Arc<dyn JobExecutor>>,
}

impl ExecutorSet {
    /// Create a table with no executors registered.
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor, replacing any previous one for the same type.
    pub fn register(&mut self, executor: Arc<dyn JobExecutor>) -> Option<Arc<dyn JobExecutor>> {
        self.executors.insert(executor.job_type(), executor)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.register(executor);
        self
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(&job_type).cloned()
    }

    /// Look up the executor for `job_type` and validate `config` against it.
    pub fn validate(&self, job_type: JobType, config: &JobConfig) -> Result<(), JobError> {
        let executor = self
            .get(job_type)
            .ok_or_else(|| JobError::Validation(format!("unknown job type: {}", job_type)))?;
        executor.validate(config)
    }

    pub fn job_types(&self) -> Vec<JobType> {
        let mut types: Vec<_> = self.executors.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

impl Default for ExecutorSet {
    fn default() -> Self {
        Self::empty()
            .with(Arc::new(EmailExecutor))
            .with(Arc::new(SyncExecutor))
            .with(Arc::new(BackupExecutor))
            .with(Arc::new(CustomExecutor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(pairs: &[(&str, &str)]) -> JobConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_default_set_covers_all_types() {
        let set = ExecutorSet::default();
        for job_type in JobType::ALL {
            assert!(set.get(job_type).is_some(), "missing executor for {}", job_type);
        }
    }

    #[test]
    fn test_validate_complete_configs() {
        let set = ExecutorSet::default();
        assert!(set
            .validate(JobType::Email, &config(&[("to", "a@b.c"), ("subject", "hi")]))
            .is_ok());
        assert!(set
            .validate(JobType::Sync, &config(&[("source", "a"), ("destination", "b")]))
            .is_ok());
        assert!(set
            .validate(JobType::Backup, &config(&[("path", "a"), ("destination", "b")]))
            .is_ok());
        assert!(set
            .validate(JobType::Custom, &config(&[("command", "echo")]))
            .is_ok());
    }

    #[test]
    fn test_validate_missing_each_required_key() {
        let set = ExecutorSet::default();
        for job_type in JobType::ALL {
            let keys = job_type.required_keys();
            for omitted in keys {
                let partial: Vec<(&str, &str)> = keys
                    .iter()
                    .filter(|k| *k != omitted)
                    .map(|k| (*k, "value"))
                    .collect();
                let err = set.validate(job_type, &config(&partial)).unwrap_err();
                assert!(matches!(err, JobError::Validation(_)));
                assert!(err.to_string().contains(omitted));
            }
        }
    }

    #[test]
    fn test_validate_unknown_type() {
        let set = ExecutorSet::empty().with(Arc::new(EmailExecutor));
        let err = set
            .validate(JobType::Custom, &config(&[("command", "ls")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown job type"));
    }

    #[test]
    fn test_register_replaces() {
        let mut set = ExecutorSet::empty();
        assert!(set.register(Arc::new(CustomExecutor)).is_none());
        assert!(set.register(Arc::new(CustomExecutor)).is_some());
        assert_eq!(set.job_types(), vec![JobType::Custom]);
    }

    #[tokio::test]
    async fn test_execute_builtins() {
        assert!(EmailExecutor
            .execute(&config(&[("to", "a@b.c"), ("subject", "hi"), ("body", "text")]))
            .await
            .is_ok());
        assert!(SyncExecutor
            .execute(&config(&[("source", "a"), ("destination", "b")]))
            .await
            .is_ok());
        assert!(BackupExecutor
            .execute(&config(&[("path", "a"), ("destination", "b")]))
            .await
            .is_ok());
        assert!(CustomExecutor
            .execute(&config(&[("command", "echo hi")]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_execute_with_non_string_value_fails() {
        let mut cfg = JobConfig::new();
        cfg.insert("command".to_string(), json!(42));
        let err = CustomExecutor.execute(&cfg).await.unwrap_err();
        assert!(matches!(err, JobError::Execution(_)));
    }
}
