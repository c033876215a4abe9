//! Job definition and type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Type-specific job configuration.
pub type JobConfig = HashMap<String, serde_json::Value>;

/// Opaque handle for a scheduler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

/// Job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Email,
    Sync,
    Backup,
    Custom,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Email,
        JobType::Sync,
        JobType::Backup,
        JobType::Custom,
    ];

    /// Config keys that must be present before a job of this type is admitted.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            JobType::Email => &["to", "subject"],
            JobType::Sync => &["source", "destination"],
            JobType::Backup => &["path", "destination"],
            JobType::Custom => &["command"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Email => "email",
            JobType::Sync => "sync",
            JobType::Backup => "backup",
            JobType::Custom => "custom",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(JobType::Email),
            "sync" => Ok(JobType::Sync),
            "backup" => Ok(JobType::Backup),
            "custom" => Ok(JobType::Custom),
            other => Err(JobError::Validation(format!("unknown job type: {}", other))),
        }
    }
}

/// A scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID. Empty means "assign one on create".
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Six-field cron expression (seconds first).
    pub schedule: String,
    /// Human-readable schedule, recomputed on every add.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schedule_desc: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: JobConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    /// Scheduler registration. Owned by the scheduler, never persisted.
    #[serde(skip)]
    pub entry_id: Option<EntryId>,
}

impl Job {
    /// Create an enabled job with an empty config.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        job_type: JobType,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            job_type,
            schedule: schedule.into(),
            schedule_desc: String::new(),
            enabled: true,
            config: JobConfig::new(),
            last_run: None,
            next_run: None,
            entry_id: None,
        }
    }

    /// Set a config value.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Set enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the last run time.
    pub fn with_last_run(mut self, last_run: DateTime<Utc>) -> Self {
        self.last_run = Some(last_run);
        self
    }

    /// Whether the job currently holds a scheduler registration.
    pub fn is_scheduled(&self) -> bool {
        self.entry_id.is_some()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
