//! PhotoId Core - concurrent resize-or-copy pipeline for image trees.
//!
//! Walks a source directory, keeps the files whose names and ages pass a
//! filter, and delivers each of them into a flat destination directory:
//! oversized images are scaled down, everything else is copied verbatim.
//!
//! # Architecture
//!
//! ```text
//! Walk → Filter → [bounded channel] → N workers (resize | copy) → [bounded channel] → Drain
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photoid_core::{Config, Pipeline, ResizeTransformer, TransformStage};
//!
//! #[tokio::main]
//! async fn main() -> photoid_core::Result<()> {
//!     let config = Config::load()?;
//!     let stage = TransformStage::new(config.transform_spec()?, Arc::new(ResizeTransformer::new()));
//!     let pipeline = Pipeline::new("./in", "./out", config.filter_criteria()?, stage, 4)?;
//!
//!     let summary = pipeline.run().await?;
//!     println!("{} files processed", summary.processed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, PhotoIdError, PipelineError, PipelineResult, Result, TransformError,
};
pub use output::{OutcomeRecord, OutputFormat, OutputWriter};
pub use pipeline::{
    Action, CancellationSignal, FilterCriteria, ImageTransformer, Outcome, Pipeline,
    PipelineSummary, ResizeTransformer, TransformSpec, TransformStage,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
