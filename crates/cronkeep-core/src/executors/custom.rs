//! Custom command job executor.

use async_trait::async_trait;
use tracing::info;

use cronkeep_protocols::{config_str, JobConfig, JobError, JobExecutor, JobType};

/// Dispatches custom commands. The command itself is run by an external integration.
pub struct CustomExecutor;

#[async_trait]
impl JobExecutor for CustomExecutor {
    fn job_type(&self) -> JobType {
        JobType::Custom
    }

    async fn execute(&self, config: &JobConfig) -> Result<(), JobError> {
        let command = config_str(config, "command")?;

        info!(command = %command, "Executing custom command");
        Ok(())
    }
}
