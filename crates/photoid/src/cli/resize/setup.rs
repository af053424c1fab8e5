//! Pipeline setup: config overrides, pre-flight checks, destination creation.

use std::path::Path;
use std::sync::Arc;

use photoid_core::{Config, ConfigError, Pipeline, ResizeTransformer, TransformStage};

use super::ResizeArgs;

/// Layer the command-line flags over the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &ResizeArgs) {
    if let Some(include) = &args.include {
        config.filter.include = include.clone();
    }
    if let Some(exclude) = &args.exclude {
        config.filter.exclude = exclude.clone();
    }
    if let Some(days) = args.max_age {
        config.filter.max_age_days = days;
    }
    // 0 on the command line clears a bound.
    if let Some(height) = args.max_height {
        config.transform.max_height = (height > 0).then_some(height);
    }
    if let Some(width) = args.max_width {
        config.transform.max_width = (width > 0).then_some(width);
    }
    if let Some(classifier) = &args.classifier {
        config.transform.classifier = Some(classifier.clone());
        config.transform.face_detect = true;
    }
    if let Some(workers) = args.workers {
        config.pipeline.workers = workers;
    }
    if let Some(buffer_size) = args.buffer_size {
        config.pipeline.buffer_size = buffer_size;
    }
}

/// Validate everything and assemble the pipeline. Nothing runs yet.
pub fn build_pipeline(config: &mut Config, args: &ResizeArgs) -> anyhow::Result<Pipeline> {
    apply_overrides(config, args);

    let spec = config.transform_spec()?;
    config.validate()?;
    if !args.source.is_dir() {
        return Err(ConfigError::SourceNotFound(args.source.clone()).into());
    }
    config.check_resources()?;

    if spec.max_height.is_some() && spec.max_width.is_some() {
        tracing::warn!(
            "Both a maximum height and a maximum width were given; \
             images are scaled to fit inside both"
        );
    }

    ensure_destination(&args.destination)?;

    let criteria = config.filter_criteria()?;
    let stage = TransformStage::new(spec, Arc::new(ResizeTransformer::new()));
    let pipeline = Pipeline::new(
        &args.source,
        &args.destination,
        criteria,
        stage,
        config.pipeline.workers,
    )?
    .with_buffer_size(config.pipeline.buffer_size);

    Ok(pipeline)
}

/// Create the destination directory (owner-only on unix) if it is missing.
pub fn ensure_destination(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)?;
    tracing::info!("Created destination directory {:?}", path);
    Ok(())
}
