//! # cronkeep Core
//!
//! The job registry and everything it needs to run jobs on schedule:
//!
//! - [`CronManager`] - Lock-guarded job map, add/update/remove/list, dispatch on fire
//! - [`CronScheduler`] - Cron trigger registrations, one tokio task per fire
//! - [`ExecutorSet`] - Job type to executor dispatch table
//! - [`describe`] - Human-readable cron schedule text

pub mod describe;
pub mod executors;
pub mod manager;
pub mod scheduler;

pub use describe::describe;
pub use executors::{BackupExecutor, CustomExecutor, EmailExecutor, ExecutorSet, SyncExecutor};
pub use manager::CronManager;
pub use scheduler::{parse_schedule, CronScheduler, JobCallback};
