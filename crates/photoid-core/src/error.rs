//! Error types for the photoid pipeline.
//!
//! Errors are split by phase: configuration problems are caught before any
//! worker starts, pipeline errors describe what went wrong while walking or
//! processing, and transform errors come back from an [`ImageTransformer`].
//!
//! [`ImageTransformer`]: crate::pipeline::ImageTransformer

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for photoid operations.
#[derive(Error, Debug)]
pub enum PhotoIdError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// An include or exclude pattern failed to compile
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Neither a maximum height nor a maximum width was given
    #[error("A maximum height and/or a maximum width must be provided")]
    MissingBounds,

    /// The face classifier resource does not exist
    #[error("Classification file not found: {0}")]
    ClassifierNotFound(PathBuf),

    /// The source directory does not exist or is not a directory
    #[error("Source directory does not exist: {0}")]
    SourceNotFound(PathBuf),
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Directory traversal failed; the remaining walk was abandoned
    #[error("Walk error at {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// The pipeline was cancelled before traversal finished
    #[error("walk canceled")]
    Canceled,

    /// The transformer rejected a file (a verbatim copy was delivered instead)
    #[error("Error rescaling image {path}. Reason: {message}")]
    Transform { path: PathBuf, message: String },

    /// The fallback copy after a failed transform also failed; the destination may be partial
    #[error("Copy failed for {path}: {message}")]
    Copy { path: PathBuf, message: String },

    /// The worker pool needs at least one worker
    #[error("Worker count must be at least 1 (got {0})")]
    InvalidWorkers(usize),

    /// A spawned task panicked or was aborted
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Whether this error is the cancellation terminal condition rather than a data error.
    pub fn is_canceled(&self) -> bool {
        matches!(self, PipelineError::Canceled)
    }
}

/// Errors returned by an image transformer.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The input stream could not be decoded as an image
    #[error("decode failed: {0}")]
    Decode(String),

    /// The transformed image could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),

    /// Reading or writing the streams failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transformer cannot handle this input or configuration
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The transformer panicked
    #[error("transformer panicked: {0}")]
    Panicked(String),
}

/// Convenience type alias for photoid results.
pub type Result<T> = std::result::Result<T, PhotoIdError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
