//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the job table. `~` is expanded.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "cron_jobs.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.db_path))
    }
}

/// Background sync loop intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    #[serde(default = "default_backup_interval_secs")]
    pub backup_interval_secs: u64,
}

fn default_save_interval_secs() -> u64 {
    30
}

fn default_backup_interval_secs() -> u64 {
    3600
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: default_save_interval_secs(),
            backup_interval_secs: default_backup_interval_secs(),
        }
    }
}

impl SyncConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }
}

/// Remote backup target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Object name of the database copy.
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Directory used as the object store.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_remote_name() -> String {
    "cronos_backups/cron_jobs.db".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_name: default_remote_name(),
            directory: None,
        }
    }
}

impl BackupConfig {
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        self.directory
            .as_deref()
            .map(|dir| PathBuf::from(ConfigLoader::expand_path(dir)))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for daily log files. Defaults to `~/.cronkeep/logs`.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn resolved_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
            None => cronkeep_dir().join("logs"),
        }
    }
}

/// `~/.cronkeep`, or `./.cronkeep` when there is no home directory.
pub fn cronkeep_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cronkeep")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.db_path, "cron_jobs.db");
        assert_eq!(config.sync.save_interval(), Duration::from_secs(30));
        assert_eq!(config.sync.backup_interval(), Duration::from_secs(3600));
        assert!(!config.backup.enabled);
        assert_eq!(config.backup.remote_name, "cronos_backups/cron_jobs.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_log_directory_default() {
        let logging = LoggingConfig::default();
        assert!(logging.resolved_directory().ends_with(".cronkeep/logs"));
    }

    #[test]
    fn test_resolved_paths_expand_tilde() {
        let storage = StorageConfig {
            db_path: "~/jobs.db".to_string(),
        };
        assert!(!storage.resolved_db_path().starts_with("~"));

        let backup = BackupConfig {
            directory: Some("~/backups".to_string()),
            ..Default::default()
        };
        assert!(!backup.resolved_directory().unwrap().starts_with("~"));
    }

    #[test]
    fn test_log_format_serde() {
        let json: LogFormat = toml::from_str::<LoggingConfig>("format = \"json\"")
            .unwrap()
            .format;
        assert_eq!(json, LogFormat::Json);
    }
}
