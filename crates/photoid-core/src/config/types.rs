//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Regular expression matched against each file's base name
    pub include: String,

    /// Regular expression that rejects a file before `include` is checked (empty = none)
    pub exclude: String,

    /// Skip files older than this many days (0 = keep everything)
    pub max_age_days: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: "jpg|png".to_string(),
            exclude: String::new(),
            max_age_days: 0,
        }
    }
}

/// Output bounds and transformer parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Maximum output height in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,

    /// Maximum output width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,

    /// Ask the transformer to keep detected faces in frame
    pub face_detect: bool,

    /// Path to the face classification resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<PathBuf>,
}

/// Pipeline settings for concurrency and backpressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of files processed concurrently
    pub workers: usize,

    /// Max paths/outcomes buffered between pipeline stages
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            buffer_size: 64,
        }
    }
}

/// Available parallelism, or 4 when the platform cannot tell.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
