//! cronkeep - cron job scheduler with durable local state.
//!
//! Main entry point for the cronkeep CLI.

mod cli;
mod cmd_run;
mod cmd_store;

use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cronkeep_backup::LocalDirStorage;
use cronkeep_config::{Config, ConfigError, ConfigLoader, ConfigValidator, LogFormat, LoggingConfig};
use cronkeep_core::describe;
use cronkeep_protocols::Storage;

use cli::{Cli, Commands};

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = logging.resolved_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("cronkeep")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes pending file writes when dropped; keep it for the whole run.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let json = logging.format == LogFormat::Json
        || std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let console = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Storage for backups: the configured directory acting as an object store.
pub(crate) fn backup_storage(config: &Config) -> Result<Arc<dyn Storage>, ConfigError> {
    let directory = config
        .backup
        .resolved_directory()
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "backup.directory".to_string(),
            message: "no backup directory configured".to_string(),
        })?;
    Ok(Arc::new(LocalDirStorage::new(directory)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging)?;

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("config {}: {}", warning.path, warning.message);
    }
    if let Err(e) = validation.into_result() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    match cli.command {
        None | Some(Commands::Run) => cmd_run::run(config).await,
        Some(Commands::Describe { expression }) => {
            println!("{}", describe(&expression)?);
            Ok(())
        }
        Some(Commands::Jobs { action }) => cmd_store::handle_jobs_command(action, &config).await,
        Some(Commands::Backup) => cmd_store::backup(&config).await,
        Some(Commands::Restore) => cmd_store::restore(&config).await,
    }
}
