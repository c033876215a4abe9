//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// The first error as a [`ConfigError::InvalidValue`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_storage(config, &mut result);
        Self::validate_sync(config, &mut result);
        Self::validate_backup(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.db_path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "storage.db_path",
                "db_path cannot be empty",
            ));
        }
    }

    fn validate_sync(config: &Config, result: &mut ValidationResult) {
        if config.sync.save_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "sync.save_interval_secs",
                "save_interval_secs must be greater than 0",
            ));
        }

        if config.sync.backup_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "sync.backup_interval_secs",
                "backup_interval_secs must be greater than 0",
            ));
        }

        if config.sync.backup_interval_secs < config.sync.save_interval_secs {
            result.add_warning(ValidationWarning::new(
                "sync.backup_interval_secs",
                "backup interval is shorter than save interval; most backups will be skipped",
            ));
        }
    }

    fn validate_backup(config: &Config, result: &mut ValidationResult) {
        if !config.backup.enabled {
            return;
        }

        if config.backup.remote_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "backup.remote_name",
                "remote_name is required when backup is enabled",
            ));
        }

        match config.backup.directory.as_deref() {
            Some(dir) if !dir.trim().is_empty() => {}
            _ => result.add_error(ValidationError::new(
                "backup.directory",
                "directory is required when backup is enabled",
            )),
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                "empty log level, falling back to info",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
