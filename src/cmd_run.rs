//! Foreground service.

use std::sync::Arc;

use tracing::{info, warn};

use cronkeep_config::Config;
use cronkeep_core::CronManager;
use cronkeep_protocols::Storage;
use cronkeep_runtime::CronService;

use crate::backup_storage;

/// Restore, load, schedule and sync until Ctrl+C, then stop cleanly.
pub(crate) async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.storage.resolved_db_path();
    let service = CronService::new(CronManager::new(), &db_path);

    let storage: Option<Arc<dyn Storage>> = if config.backup.enabled {
        Some(backup_storage(&config)?)
    } else {
        None
    };

    if let Some(storage) = &storage {
        service
            .restore(storage.clone(), &config.backup.remote_name)
            .await?;
    }

    let loaded = service.start().await?;
    info!(path = %db_path.display(), "Loaded {} jobs", loaded);

    service
        .start_background_sync(
            config.sync.save_interval(),
            config.sync.backup_interval(),
            &config.backup.remote_name,
            storage,
        )
        .await?;

    info!("cronkeep running. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }

    info!("Shutting down...");
    let saved = service.stop().await?;
    info!("Saved {} jobs, goodbye", saved);
    Ok(())
}
