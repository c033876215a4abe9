//! Cron scheduler that fires registered callbacks on their own tasks.
//!
//! Every registered entry owns one timer task while the scheduler is running.
//! The timer task sleeps until the entry's next occurrence, publishes the
//! following occurrence, and spawns the callback as an independent task, so a
//! slow callback never delays the entry's timer or any other entry.
//!
//! # Cron Expression Format
//!
//! `second minute hour day_of_month month day_of_week [year]`
//!
//! - `"0 0 * * * *"` - Every hour at minute 0
//! - `"0 */5 * * * *"` - Every 5 minutes
//! - `"0 0 9 * * MON-FRI"` - 9 AM on weekdays

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cronkeep_protocols::{EntryId, JobError};

/// Callback invoked on every fire of an entry.
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

type Entries = Arc<Mutex<HashMap<EntryId, Entry>>>;

struct Entry {
    schedule: Schedule,
    expression: String,
    callback: JobCallback,
    /// Next fire time as last computed by the timer task.
    next: Option<DateTime<Utc>>,
    /// Present while a timer task is running for this entry.
    cancel: Option<CancellationToken>,
}

/// Parse a cron expression.
pub fn parse_schedule(expression: &str) -> Result<Schedule, JobError> {
    if expression.trim().is_empty() {
        return Err(JobError::schedule(expression, "schedule cannot be empty"));
    }
    Schedule::from_str(expression).map_err(|e| JobError::schedule(expression, e))
}

/// Cron trigger registry.
pub struct CronScheduler {
    entries: Entries,
    next_id: AtomicU64,
    /// Root token while running; entry tokens are its children.
    root: Mutex<Option<CancellationToken>>,
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CronScheduler {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            root: Mutex::new(None),
        }
    }

    /// Register a callback for every occurrence of `expression`.
    ///
    /// The first fire time is available from [`next_run`](Self::next_run)
    /// immediately, even before the scheduler is started.
    pub fn add(&self, expression: &str, callback: JobCallback) -> Result<EntryId, JobError> {
        let schedule = parse_schedule(expression)?;
        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let root = self.root.lock();
        let mut entries = self.entries.lock();
        let mut entry = Entry {
            next: schedule.upcoming(Utc).next(),
            schedule,
            expression: expression.to_string(),
            callback,
            cancel: None,
        };
        if let Some(root) = root.as_ref() {
            self.spawn_timer(id, &mut entry, root);
        }
        entries.insert(id, entry);

        debug!("Registered {} for '{}'", id, expression);
        Ok(id)
    }

    /// Unregister an entry. Returns false if it was not registered.
    pub fn remove(&self, id: EntryId) -> bool {
        let removed = self.entries.lock().remove(&id);
        match removed {
            Some(entry) => {
                if let Some(token) = entry.cancel {
                    token.cancel();
                }
                debug!("Unregistered {} ('{}')", id, entry.expression);
                true
            }
            None => false,
        }
    }

    /// Next fire time of an entry.
    pub fn next_run(&self, id: EntryId) -> Option<DateTime<Utc>> {
        self.entries.lock().get(&id).and_then(|e| e.next)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.root.lock().is_some()
    }

    /// Start firing. Entries registered before this call get their timers now.
    pub fn start(&self) {
        let mut root = self.root.lock();
        if root.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let mut entries = self.entries.lock();
        for (id, entry) in entries.iter_mut() {
            self.spawn_timer(*id, entry, &token);
        }
        info!("Cron scheduler started with {} entries", entries.len());
        *root = Some(token);
    }

    /// Stop firing. No new fires happen after this returns; in-flight
    /// callbacks run to completion. Registrations are kept.
    pub fn stop(&self) {
        let mut root = self.root.lock();
        let Some(token) = root.take() else {
            return;
        };
        token.cancel();
        for entry in self.entries.lock().values_mut() {
            entry.cancel = None;
        }
        info!("Cron scheduler stopped");
    }

    fn spawn_timer(&self, id: EntryId, entry: &mut Entry, root: &CancellationToken) {
        let token = root.child_token();
        entry.cancel = Some(token.clone());
        tokio::spawn(run_timer(
            self.entries.clone(),
            id,
            entry.schedule.clone(),
            entry.callback.clone(),
            token,
        ));
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        if let Some(token) = self.root.lock().take() {
            token.cancel();
        }
    }
}

async fn run_timer(
    entries: Entries,
    id: EntryId,
    schedule: Schedule,
    callback: JobCallback,
    token: CancellationToken,
) {
    let mut cursor = Utc::now();

    loop {
        let Some(next) = schedule.after(&cursor).next() else {
            debug!("{} has no upcoming occurrence", id);
            break;
        };
        if !publish_next(&entries, id, Some(next)) {
            break;
        }

        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
        if token.is_cancelled() {
            break;
        }

        cursor = next;
        // Publish the following occurrence before firing so the callback's
        // post-execution update never reads a time in the past.
        if !publish_next(&entries, id, schedule.after(&cursor).next()) {
            break;
        }

        debug!("{} fired at {}", id, next.to_rfc3339());
        tokio::spawn(callback());
    }
}

/// Returns false once the entry has been unregistered.
fn publish_next(entries: &Entries, id: EntryId, next: Option<DateTime<Utc>>) -> bool {
    match entries.lock().get_mut(&id) {
        Some(entry) => {
            entry.next = next;
            true
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
