//! Data synchronization job executor.

use async_trait::async_trait;
use tracing::info;

use cronkeep_protocols::{config_str, JobConfig, JobError, JobExecutor, JobType};

pub struct SyncExecutor;

#[async_trait]
impl JobExecutor for SyncExecutor {
    fn job_type(&self) -> JobType {
        JobType::Sync
    }

    async fn execute(&self, config: &JobConfig) -> Result<(), JobError> {
        let source = config_str(config, "source")?;
        let destination = config_str(config, "destination")?;

        info!(source = %source, destination = %destination, "Syncing data");
        Ok(())
    }
}
