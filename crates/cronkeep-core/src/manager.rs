//! Job registry: the lock-guarded map of live jobs and their triggers.
//!
//! All mutations take the map's write lock; `get`/`list`/`snapshot` take the
//! read lock. Executors always run with no lock held: on fire, the callback
//! copies what it needs under the read lock, executes, then re-takes the
//! write lock to record `last_run` and refresh `next_run`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use cronkeep_protocols::{Job, JobError};

use crate::describe::describe;
use crate::executors::ExecutorSet;
use crate::scheduler::{parse_schedule, CronScheduler, JobCallback};

/// Attempts at a random ID before falling back to a timestamp.
const MAX_ID_ATTEMPTS: usize = 100;

/// In-memory job registry bound to a cron scheduler.
pub struct CronManager {
    jobs: RwLock<HashMap<String, Job>>,
    executors: ExecutorSet,
    scheduler: CronScheduler,
    /// Back-reference handed to trigger callbacks.
    this: Weak<CronManager>,
}

impl CronManager {
    /// Create a registry with the built-in executors.
    pub fn new() -> Arc<Self> {
        Self::with_executors(ExecutorSet::default())
    }

    pub fn with_executors(executors: ExecutorSet) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            jobs: RwLock::new(HashMap::new()),
            executors,
            scheduler: CronScheduler::new(),
            this: this.clone(),
        })
    }

    pub fn scheduler(&self) -> &CronScheduler {
        &self.scheduler
    }

    pub fn executors(&self) -> &ExecutorSet {
        &self.executors
    }

    /// Start firing triggers.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop firing triggers. In-flight executions finish on their own.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Admit a job under its own ID.
    ///
    /// Re-adding an existing ID replaces the previous record and its trigger.
    pub async fn add_job(&self, job: Job) -> Result<Job, JobError> {
        if job.id.trim().is_empty() {
            return Err(JobError::Validation("job id cannot be empty".to_string()));
        }
        let mut jobs = self.jobs.write().await;
        self.admit(&mut jobs, job)
    }

    /// Admit a job, assigning a fresh ID when it has none.
    pub async fn create_job(&self, mut job: Job) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        if job.id.trim().is_empty() {
            job.id = unique_id_in(&jobs);
        }
        self.admit(&mut jobs, job)
    }

    /// Unregister and evict a job.
    pub async fn remove_job(&self, id: &str) -> Result<Job, JobError> {
        let mut job = self
            .jobs
            .write()
            .await
            .remove(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if let Some(entry) = job.entry_id.take() {
            self.scheduler.remove(entry);
        }
        job.next_run = None;

        info!(job = %id, "Removed job '{}'", job.name);
        Ok(job)
    }

    /// Replace a job's definition, keeping its ID.
    ///
    /// The new definition is fully validated before the existing job is
    /// touched, and the swap happens under one write lock, so readers see
    /// either the old or the new job and never a gap. `last_run` is kept from
    /// the existing job; whatever the caller passes is ignored.
    pub async fn update_job(&self, id: &str, mut job: Job) -> Result<Job, JobError> {
        self.validate_definition(&job)?;

        let mut jobs = self.jobs.write().await;
        let Some(existing) = jobs.get(id) else {
            return Err(JobError::NotFound(id.to_string()));
        };

        // Only execution records a run.
        job.last_run = existing.last_run;
        job.id = id.to_string();
        let updated = self.admit(&mut jobs, job)?;
        info!(job = %id, "Updated job '{}'", updated.name);
        Ok(updated)
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// All jobs, most recently run first. Never-run jobs come last; ties go
    /// by name.
    pub async fn list_jobs(&self) -> Vec<Job> {
        let mut jobs = self.snapshot().await;
        jobs.sort_by(compare_for_listing);
        jobs
    }

    /// Clone every job in map order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// A job ID not currently in use.
    pub async fn generate_unique_id(&self) -> String {
        unique_id_in(&*self.jobs.read().await)
    }

    /// English description of a cron expression.
    pub fn describe_schedule(&self, expression: &str) -> Result<String, JobError> {
        parse_schedule(expression)?;
        describe(expression)
    }

    fn validate_definition(&self, job: &Job) -> Result<(), JobError> {
        self.executors.validate(job.job_type, &job.config)?;
        parse_schedule(&job.schedule)?;
        Ok(())
    }

    /// Validate, describe, register and insert. The caller holds the write lock.
    fn admit(&self, jobs: &mut HashMap<String, Job>, mut job: Job) -> Result<Job, JobError> {
        self.validate_definition(&job)?;

        job.schedule_desc = match describe(&job.schedule) {
            Ok(desc) => desc,
            Err(e) => {
                warn!(job = %job.id, "Could not describe schedule: {}", e);
                job.schedule.clone()
            }
        };

        job.entry_id = None;
        job.next_run = None;
        if job.enabled {
            let entry = self
                .scheduler
                .add(&job.schedule, self.dispatch_callback(&job.id))?;
            job.entry_id = Some(entry);
            job.next_run = self.scheduler.next_run(entry);
        }

        if let Some(previous) = jobs.insert(job.id.clone(), job.clone()) {
            if let Some(entry) = previous.entry_id {
                self.scheduler.remove(entry);
            }
        }

        debug!(
            job = %job.id,
            enabled = job.enabled,
            "Admitted '{}' ({}): {}",
            job.name,
            job.job_type,
            job.schedule_desc
        );
        Ok(job)
    }

    fn dispatch_callback(&self, id: &str) -> JobCallback {
        let this = self.this.clone();
        let id = id.to_string();
        Arc::new(move || {
            let this = this.clone();
            let id = id.clone();
            async move {
                if let Some(manager) = this.upgrade() {
                    manager.execute_job(&id).await;
                }
            }
            .boxed()
        })
    }

    /// Run one fire of a job.
    pub(crate) async fn execute_job(&self, id: &str) {
        let (name, job_type, config) = {
            let jobs = self.jobs.read().await;
            match jobs.get(id) {
                Some(job) if job.enabled => (job.name.clone(), job.job_type, job.config.clone()),
                Some(_) => {
                    debug!(job = %id, "Skipping disabled job");
                    return;
                }
                None => return,
            }
        };

        let Some(executor) = self.executors.get(job_type) else {
            error!(job = %id, "No executor for job type {}", job_type);
            return;
        };

        match executor.execute(&config).await {
            Ok(()) => info!(job = %id, "Job '{}' completed", name),
            Err(e) => error!(job = %id, "Job '{}' failed: {}", name, e),
        }

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.last_run = Some(Utc::now());
            if let Some(entry) = job.entry_id {
                job.next_run = self.scheduler.next_run(entry);
            }
        }
    }
}

fn compare_for_listing(a: &Job, b: &Job) -> Ordering {
    let by_last_run = match (a.last_run, b.last_run) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_last_run.then_with(|| a.name.cmp(&b.name))
}

fn unique_id_in(jobs: &HashMap<String, Job>) -> String {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = Uuid::new_v4().to_string();
        if !jobs.contains_key(&id) {
            return id;
        }
    }
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("job_{}", nanos)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
