//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.workers == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.workers must be > 0".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.transform.max_height == Some(0) {
            return Err(ConfigError::ValidationError(
                "transform.max_height must be > 0 when set".into(),
            ));
        }
        if self.transform.max_width == Some(0) {
            return Err(ConfigError::ValidationError(
                "transform.max_width must be > 0 when set".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if self.logging.format != "pretty" && self.logging.format != "json" {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        // Compiling the criteria surfaces malformed patterns before any worker starts.
        self.filter_criteria()?;
        Ok(())
    }

    /// Check that the resources the configuration points at exist on disk.
    pub fn check_resources(&self) -> Result<(), ConfigError> {
        if let Some(classifier) = self.classifier_path() {
            if !classifier.is_file() {
                return Err(ConfigError::ClassifierNotFound(classifier));
            }
        } else if self.transform.face_detect {
            return Err(ConfigError::ValidationError(
                "transform.face_detect requires transform.classifier".into(),
            ));
        }
        Ok(())
    }
}
