//! Default transformer: aspect-preserving downscale with the `image` crate.

use std::io::{Cursor, Read, Write};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::TransformError;

use super::transform::{ImageTransformer, TransformSpec};

/// Scales images down to fit the configured bounds and re-encodes them in
/// their source format.
///
/// Face-guided cropping is not performed; `face_detect` and `classifier` are
/// ignored by this transformer.
#[derive(Debug, Clone)]
pub struct ResizeTransformer {
    filter: FilterType,
}

impl ResizeTransformer {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    fn resize(&self, image: &DynamicImage, spec: &TransformSpec) -> DynamicImage {
        let (width, height) = target_size(image.width(), image.height(), spec);
        if (width, height) == (image.width(), image.height()) {
            return image.clone();
        }
        image.resize_exact(width, height, self.filter)
    }
}

impl Default for ResizeTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTransformer for ResizeTransformer {
    fn transform(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        spec: &TransformSpec,
    ) -> Result<(), TransformError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(format!("cannot detect format: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| TransformError::Unsupported("unrecognized image format".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))?;

        let resized = self.resize(&image, spec);
        let encoded = encode(&resized, format)?;
        output.write_all(&encoded)?;
        Ok(())
    }
}

/// Largest size that fits inside the bounds while keeping the aspect ratio.
///
/// Never upscales; a missing bound does not constrain that axis.
pub fn target_size(width: u32, height: u32, spec: &TransformSpec) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale_h = spec
        .max_height
        .map(|max| f64::from(max) / f64::from(height))
        .unwrap_or(f64::INFINITY);
    let scale_w = spec
        .max_width
        .map(|max| f64::from(max) / f64::from(width))
        .unwrap_or(f64::INFINITY);
    let scale = scale_h.min(scale_w);
    if scale >= 1.0 {
        return (width, height);
    }

    let fit = |dim: u32, max: Option<u32>| {
        let scaled = (f64::from(dim) * scale).round().max(1.0) as u32;
        max.map_or(scaled, |m| scaled.min(m))
    };
    (fit(width, spec.max_width), fit(height, spec.max_height))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Cursor::new(Vec::new());
    // JPEG has no alpha channel; flatten before encoding.
    let result = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut buffer, format)
    } else {
        image.write_to(&mut buffer, format)
    };
    result.map_err(|e| TransformError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}
