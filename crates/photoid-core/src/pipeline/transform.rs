//! Per-file stage: resize oversized images, copy everything else verbatim.
//!
//! Only the image header is read to decide which path a file takes. When the
//! transformer fails, the source is copied over the destination so every
//! accepted file ends up delivered in some usable form.

use std::any::Any;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ConfigError, PipelineError, TransformError};

/// Output bounds plus parameters for the transformer. Read-only once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSpec {
    /// Maximum output height in pixels
    pub max_height: Option<u32>,
    /// Maximum output width in pixels
    pub max_width: Option<u32>,
    /// Keep detected faces in frame (transformer-specific)
    pub face_detect: bool,
    /// Face classification resource for transformers that detect faces
    pub classifier: Option<PathBuf>,
}

impl TransformSpec {
    /// At least one of the bounds must be set.
    pub fn new(max_height: Option<u32>, max_width: Option<u32>) -> Result<Self, ConfigError> {
        if max_height.is_none() && max_width.is_none() {
            return Err(ConfigError::MissingBounds);
        }
        Ok(Self {
            max_height,
            max_width,
            face_detect: false,
            classifier: None,
        })
    }

    /// Whether an image of this size exceeds the bounds.
    ///
    /// One pixel of slack on each bound absorbs decoder rounding.
    pub fn needs_transform(&self, width: u32, height: u32) -> bool {
        let too_tall = self
            .max_height
            .is_some_and(|max| u64::from(height) > u64::from(max) + 1);
        let too_wide = self
            .max_width
            .is_some_and(|max| u64::from(width) > u64::from(max) + 1);
        too_tall || too_wide
    }
}

/// The image operation applied to oversized files.
///
/// Implementations are called from blocking threads, one file at a time per
/// worker, and must not assume anything about which thread they run on.
pub trait ImageTransformer: Send + Sync {
    /// Read an encoded image from `input` and write the transformed image to `output`.
    fn transform(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        spec: &TransformSpec,
    ) -> Result<(), TransformError>;
}

/// What the stage did with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Within bounds (or unreadable header); bytes copied verbatim
    Copied,
    /// The transformer produced the destination
    Transformed,
    /// The transformer failed; the source was copied instead
    FellBack,
}

/// Result of processing one accepted path.
#[derive(Debug)]
pub struct Outcome {
    /// Source file
    pub path: PathBuf,
    /// Where the result was written
    pub destination: PathBuf,
    /// Which path the file took
    pub action: Action,
    /// Transform failure, if any. Informational: the destination still holds a copy.
    pub error: Option<PipelineError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Applies a [`TransformSpec`] to single files through an [`ImageTransformer`].
pub struct TransformStage {
    spec: Arc<TransformSpec>,
    transformer: Arc<dyn ImageTransformer>,
}

impl fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStage")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl TransformStage {
    pub fn new(spec: TransformSpec, transformer: Arc<dyn ImageTransformer>) -> Self {
        Self {
            spec: Arc::new(spec),
            transformer,
        }
    }

    /// Process `source` into `destination`. Blocking.
    pub fn apply(&self, source: &Path, destination: &Path) -> Outcome {
        if !self.needs_transform(source) {
            if let Err(e) = copy_file(source, destination) {
                // Copy failures are logged only; the outcome stays successful.
                tracing::warn!("Copy of {:?} to {:?} failed: {}", source, destination, e);
            }
            return self.outcome(source, destination, Action::Copied, None);
        }

        match self.run_guarded(source, destination) {
            Ok(()) => {
                let name = destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::info!("file resized to: {}", name);
                self.outcome(source, destination, Action::Transformed, None)
            }
            Err(e) => {
                tracing::warn!("Error rescaling image {:?}. Reason: {}", source, e);
                let error = match copy_file(source, destination) {
                    Ok(_) => PipelineError::Transform {
                        path: source.to_path_buf(),
                        message: e.to_string(),
                    },
                    Err(copy_err) => {
                        tracing::warn!(
                            "Fallback copy of {:?} to {:?} failed: {}",
                            source,
                            destination,
                            copy_err
                        );
                        PipelineError::Copy {
                            path: source.to_path_buf(),
                            message: format!("{copy_err} (after rescale failed: {e})"),
                        }
                    }
                };
                self.outcome(source, destination, Action::FellBack, Some(error))
            }
        }
    }

    /// Read just the header of `source` and check it against the bounds.
    ///
    /// A header that cannot be read means "no transform": the file gets copied.
    pub fn needs_transform(&self, source: &Path) -> bool {
        match read_dimensions(source) {
            Ok((width, height)) => {
                let needed = self.spec.needs_transform(width, height);
                tracing::trace!("{:?} is {}x{} (transform: {})", source, width, height, needed);
                needed
            }
            Err(e) => {
                tracing::warn!("Cannot read image size of {:?}: {}", source, e);
                false
            }
        }
    }

    /// Run the transformer, turning a panic into an ordinary failure so the
    /// fallback copy still replaces whatever was half-written.
    fn run_guarded(&self, source: &Path, destination: &Path) -> Result<(), TransformError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_transformer(source, destination)))
            .unwrap_or_else(|payload| Err(TransformError::Panicked(panic_message(&*payload))))
    }

    fn run_transformer(&self, source: &Path, destination: &Path) -> Result<(), TransformError> {
        let mut reader = BufReader::new(File::open(source)?);
        let mut writer = BufWriter::new(open_destination(destination)?);
        self.transformer
            .transform(&mut reader, &mut writer, &self.spec)?;
        writer.flush()?;
        Ok(())
    }

    fn outcome(
        &self,
        source: &Path,
        destination: &Path,
        action: Action,
        error: Option<PipelineError>,
    ) -> Outcome {
        Outcome {
            path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            action,
            error,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "transformer panicked".to_string()
    }
}

/// Width and height from the image header, without decoding pixels.
pub fn read_dimensions(path: &Path) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
}

/// Copy the bytes of `src` into `dst`, truncating whatever `dst` held.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut source = File::open(src)?;
    let mut destination = File::create(dst)?;
    io::copy(&mut source, &mut destination)
}

/// Create (or truncate) the transform destination, owner rwx on unix.
fn open_destination(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    options.open(path)
}
