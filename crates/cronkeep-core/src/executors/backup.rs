//! Backup job executor.

use async_trait::async_trait;
use tracing::info;

use cronkeep_protocols::{config_str, JobConfig, JobError, JobExecutor, JobType};

pub struct BackupExecutor;

#[async_trait]
impl JobExecutor for BackupExecutor {
    fn job_type(&self) -> JobType {
        JobType::Backup
    }

    async fn execute(&self, config: &JobConfig) -> Result<(), JobError> {
        let path = config_str(config, "path")?;
        let destination = config_str(config, "destination")?;

        info!(path = %path, destination = %destination, "Backing up");
        Ok(())
    }
}
