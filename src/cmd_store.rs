//! One-shot commands against the local database and its backup.

use tracing::info;

use cronkeep_backup::{BackupCoordinator, BackupOutcome, RestoreOutcome};
use cronkeep_config::Config;
use cronkeep_core::CronManager;
use cronkeep_store::SqliteJobStore;

use crate::backup_storage;
use crate::cli::JobsAction;

pub(crate) async fn handle_jobs_command(
    action: JobsAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        JobsAction::List { format } => jobs_list(config, &format).await,
    }
}

async fn jobs_list(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteJobStore::new(config.storage.resolved_db_path());
    if !store.exists() {
        println!("No database at {}", store.path().display());
        return Ok(());
    }

    // Load into a registry that is never started, so nothing fires.
    let manager = CronManager::new();
    let report = store.load_all(&manager).await?;
    for error in &report.errors {
        eprintln!("skipped: {}", error);
    }

    let jobs = manager.list_jobs().await;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
        _ => {
            println!(
                "{:<38} {:<24} {:<8} {:<8} {:<20} {}",
                "ID", "NAME", "TYPE", "ENABLED", "LAST RUN", "SCHEDULE"
            );
            println!("{}", "-".repeat(120));
            for job in jobs {
                let last_run = job
                    .last_run
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<38} {:<24} {:<8} {:<8} {:<20} {}",
                    job.id,
                    job.name,
                    job.job_type.as_str(),
                    job.enabled,
                    last_run,
                    job.schedule_desc
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn backup(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.storage.resolved_db_path();
    let coordinator = BackupCoordinator::new(backup_storage(config)?);

    match coordinator.backup(&db_path, &config.backup.remote_name).await? {
        BackupOutcome::Uploaded { checksum } => {
            println!("Uploaded {} ({})", config.backup.remote_name, checksum)
        }
        BackupOutcome::Skipped { checksum } => {
            println!("Unchanged since last upload ({})", checksum)
        }
    }
    Ok(())
}

pub(crate) async fn restore(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.storage.resolved_db_path();
    let coordinator = BackupCoordinator::new(backup_storage(config)?);

    match coordinator.restore(&db_path, &config.backup.remote_name).await? {
        RestoreOutcome::Restored { checksum, bytes } => {
            info!(checksum = %checksum, "Restore complete");
            println!("Restored {} bytes into {}", bytes, db_path.display());
        }
        RestoreOutcome::StartedFresh => {
            println!("No remote copy of {}", config.backup.remote_name);
        }
    }
    Ok(())
}
