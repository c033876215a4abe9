//! Service lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use cronkeep_backup::{BackupCoordinator, BackupOutcome, RestoreOutcome};
use cronkeep_core::CronManager;
use cronkeep_protocols::{Job, Storage};
use cronkeep_store::SqliteJobStore;

use crate::error::RuntimeError;
use crate::sync::{BackupTarget, SyncLoop, SyncState};

/// The registry plus its durable state.
///
/// Typical lifecycle: [`restore`](Self::restore) (optional),
/// [`start`](Self::start), [`start_background_sync`](Self::start_background_sync),
/// then [`stop`](Self::stop) on shutdown.
pub struct CronService {
    manager: Arc<CronManager>,
    store: SqliteJobStore,
    sync: Mutex<Option<SyncLoop>>,
}

impl CronService {
    pub fn new(manager: Arc<CronManager>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            manager,
            store: SqliteJobStore::new(db_path),
            sync: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<CronManager> {
        &self.manager
    }

    pub fn store(&self) -> &SqliteJobStore {
        &self.store
    }

    pub fn db_path(&self) -> &Path {
        self.store.path()
    }

    /// Seed the local database from `storage`. Call before [`start`](Self::start).
    pub async fn restore(
        &self,
        storage: Arc<dyn Storage>,
        remote_name: &str,
    ) -> Result<RestoreOutcome, RuntimeError> {
        let outcome = BackupCoordinator::new(storage)
            .restore(self.store.path(), remote_name)
            .await?;
        Ok(outcome)
    }

    /// Load persisted jobs, if any, and start the scheduler.
    ///
    /// Rows that fail to load are logged and skipped. Returns the number of
    /// jobs loaded.
    pub async fn start(&self) -> Result<usize, RuntimeError> {
        let loaded = if self.store.exists() {
            let report = self.store.load_all(&self.manager).await?;
            let loaded = report.loaded;
            if let Err(e) = report.into_result() {
                warn!(path = %self.store.path().display(), "{}", e);
            }
            loaded
        } else {
            info!(path = %self.store.path().display(), "No database yet, starting empty");
            0
        };

        self.manager.start();
        info!("Cron service started with {} jobs", self.manager.len().await);
        Ok(loaded)
    }

    /// Start the periodic save loop, plus backups when `storage` is given and
    /// `remote_name` is not empty. Replaces any loop already running.
    pub async fn start_background_sync(
        &self,
        save_interval: Duration,
        backup_interval: Duration,
        remote_name: &str,
        storage: Option<Arc<dyn Storage>>,
    ) -> Result<(), RuntimeError> {
        if save_interval.is_zero() {
            return Err(RuntimeError::InvalidInterval("save interval is zero".to_string()));
        }

        let backup = match storage {
            Some(storage) if !remote_name.trim().is_empty() => {
                if backup_interval.is_zero() {
                    return Err(RuntimeError::InvalidInterval(
                        "backup interval is zero".to_string(),
                    ));
                }
                Some(BackupTarget {
                    coordinator: BackupCoordinator::new(storage),
                    remote_name: remote_name.to_string(),
                    interval: backup_interval,
                })
            }
            _ => None,
        };

        let mut sync = self.sync.lock().await;
        if let Some(mut previous) = sync.take() {
            previous.stop().await;
        }
        *sync = Some(SyncLoop::spawn(
            self.manager.clone(),
            self.store.clone(),
            save_interval,
            backup,
        ));
        Ok(())
    }

    /// State of the current sync loop, if one was started.
    pub async fn sync_state(&self) -> Option<SyncState> {
        self.sync.lock().await.as_ref().map(SyncLoop::state)
    }

    /// Save the registry now.
    pub async fn save_now(&self) -> Result<usize, RuntimeError> {
        Ok(self.store.save_all(&self.manager).await?)
    }

    /// Push the database file to `storage` now, subject to the checksum gate.
    pub async fn backup_now(
        &self,
        storage: Arc<dyn Storage>,
        remote_name: &str,
    ) -> Result<BackupOutcome, RuntimeError> {
        let outcome = BackupCoordinator::new(storage)
            .backup(self.store.path(), remote_name)
            .await?;
        Ok(outcome)
    }

    /// Remove a job from the registry and from the database.
    ///
    /// Saving only ever upserts, so a job removed from the registry alone
    /// would come back on the next load.
    pub async fn remove_job(&self, id: &str) -> Result<Job, RuntimeError> {
        let job = self.manager.remove_job(id).await?;
        if self.store.exists() {
            self.store.delete(id).await?;
        }
        Ok(job)
    }

    /// Stop scheduling, stop the sync loop, then save one last time.
    pub async fn stop(&self) -> Result<usize, RuntimeError> {
        self.manager.stop();

        if let Some(mut sync) = self.sync.lock().await.take() {
            sync.stop().await;
        }

        let saved = self.store.save_all(&self.manager).await?;
        info!(path = %self.store.path().display(), "Cron service stopped, saved {} jobs", saved);
        Ok(saved)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
