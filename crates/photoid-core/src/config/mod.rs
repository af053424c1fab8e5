//! Configuration management for photoid.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Command-line flags are layered on top by the binary.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::pipeline::{FilterCriteria, TransformSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for photoid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File selection settings
    pub filter: FilterConfig,

    /// Output bounds and transformer settings
    pub transform: TransformConfig,

    /// Concurrency settings
    pub pipeline: PipelineConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.photoid.photoid/config.toml
    /// - Linux: ~/.config/photoid/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\photoid\config\config.toml
    ///
    /// Falls back to ~/.photoid/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "photoid", "photoid")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".photoid").join("config.toml")
            })
    }

    /// Get the resolved classifier path (with ~ expansion), if one is configured.
    pub fn classifier_path(&self) -> Option<PathBuf> {
        self.transform.classifier.as_ref().map(|path| {
            let path_str = path.to_string_lossy();
            let expanded = shellexpand::tilde(&path_str);
            PathBuf::from(expanded.into_owned())
        })
    }

    /// Compile the filter settings into pipeline criteria.
    pub fn filter_criteria(&self) -> Result<FilterCriteria, ConfigError> {
        let exclude = Some(self.filter.exclude.as_str()).filter(|p| !p.is_empty());
        FilterCriteria::new(&self.filter.include, exclude, self.filter.max_age_days)
    }

    /// Build the transform spec, resolving the classifier path.
    pub fn transform_spec(&self) -> Result<TransformSpec, ConfigError> {
        let mut spec = TransformSpec::new(self.transform.max_height, self.transform.max_width)?;
        spec.face_detect = self.transform.face_detect;
        spec.classifier = self.classifier_path();
        Ok(spec)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
