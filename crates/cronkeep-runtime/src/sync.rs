//! Background sync loop.
//!
//! One task, two independent tickers: a save tick that upserts the registry
//! into SQLite, and an optional backup tick that pushes the database file
//! through the [`BackupCoordinator`]. Failures are logged and retried on the
//! next tick. Cancellation is observed between ticks, never in the middle of
//! a save or upload.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cronkeep_backup::{BackupCoordinator, BackupOutcome};
use cronkeep_core::CronManager;
use cronkeep_store::SqliteJobStore;

/// Sync loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncState {
    Running = 0,
    /// Cancelled, finishing the current tick.
    Stopping = 1,
    /// Terminal.
    Stopped = 2,
}

impl From<u8> for SyncState {
    fn from(v: u8) -> Self {
        match v {
            0 => SyncState::Running,
            1 => SyncState::Stopping,
            _ => SyncState::Stopped,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Running => write!(f, "running"),
            SyncState::Stopping => write!(f, "stopping"),
            SyncState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Backup half of the loop.
pub(crate) struct BackupTarget {
    pub coordinator: BackupCoordinator,
    pub remote_name: String,
    pub interval: Duration,
}

/// Handle to a running sync loop.
pub struct SyncLoop {
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SyncLoop {
    pub(crate) fn spawn(
        manager: Arc<CronManager>,
        store: SqliteJobStore,
        save_interval: Duration,
        backup: Option<BackupTarget>,
    ) -> Self {
        let state = Arc::new(AtomicU8::new(SyncState::Running as u8));
        let cancel = CancellationToken::new();

        info!(
            "Sync loop started (save every {:?}, backup {})",
            save_interval,
            match &backup {
                Some(target) => format!("every {:?} to {}", target.interval, target.remote_name),
                None => "disabled".to_string(),
            }
        );

        let handle = tokio::spawn(run(
            manager,
            store,
            save_interval,
            backup,
            state.clone(),
            cancel.clone(),
        ));

        Self {
            state,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> SyncState {
        SyncState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SyncState::Running
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(&mut self) {
        let _ = self.state.compare_exchange(
            SyncState::Running as u8,
            SyncState::Stopping as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.cancel.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Sync loop task ended abnormally: {}", e);
            }
        }
        self.state.store(SyncState::Stopped as u8, Ordering::SeqCst);
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run(
    manager: Arc<CronManager>,
    store: SqliteJobStore,
    save_interval: Duration,
    backup: Option<BackupTarget>,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
) {
    let db_path: PathBuf = store.path().to_path_buf();
    let mut save_tick = ticker(save_interval);
    let mut backup_tick = backup.as_ref().map(|target| ticker(target.interval));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = state.compare_exchange(
                    SyncState::Running as u8,
                    SyncState::Stopping as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                break;
            }
            _ = save_tick.tick() => {
                match store.save_all(&manager).await {
                    Ok(count) => debug!(path = %db_path.display(), "Periodic save wrote {} jobs", count),
                    Err(e) => warn!(path = %db_path.display(), "Periodic save failed: {}", e),
                }
            }
            _ = next_tick(&mut backup_tick) => {
                let Some(target) = backup.as_ref() else {
                    continue;
                };
                match target.coordinator.backup(&db_path, &target.remote_name).await {
                    Ok(BackupOutcome::Uploaded { checksum }) => {
                        debug!(remote = %target.remote_name, checksum = %checksum, "Periodic backup uploaded");
                    }
                    Ok(BackupOutcome::Skipped { .. }) => {}
                    Err(e) => warn!(remote = %target.remote_name, "Periodic backup failed: {}", e),
                }
            }
        }
    }

    state.store(SyncState::Stopped as u8, Ordering::SeqCst);
    info!("Sync loop stopped");
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
