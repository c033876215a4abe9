//! Email job executor.

use async_trait::async_trait;
use tracing::info;

use cronkeep_protocols::{config_str, JobConfig, JobError, JobExecutor, JobType};

/// Dispatches email jobs. Requires `to` and `subject`; `body` is optional.
pub struct EmailExecutor;

#[async_trait]
impl JobExecutor for EmailExecutor {
    fn job_type(&self) -> JobType {
        JobType::Email
    }

    async fn execute(&self, config: &JobConfig) -> Result<(), JobError> {
        let to = config_str(config, "to")?;
        let subject = config_str(config, "subject")?;

        // body is never logged
        info!(to = %to, subject = %subject, "Sending email");
        Ok(())
    }
}
