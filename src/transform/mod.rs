//! Image transform: timestamp overlay, logo overlay and resize.
//!
//! The watcher only depends on the [`ImageTransform`] trait; [`OverlayResize`]
//! is the production implementation.

mod metadata;
mod overlay;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontdue::{Font, FontSettings};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use parking_lot::Mutex;

pub use self::metadata::{capture_date, overlay_label};
pub use self::overlay::{draw_text, overlay_logo, TextStyle};
use crate::error::TransformError;
use crate::watcher::TransformParams;

/// Turns a source image into a derived image inside `output_dir`.
pub trait ImageTransform: Send + Sync {
    /// Produce the derived image and return its path.
    ///
    /// # Errors
    ///
    /// Returns a `TransformError` for any per-file failure.
    fn apply(
        &self,
        source: &Path,
        output_dir: &Path,
        params: &TransformParams,
    ) -> Result<PathBuf, TransformError>;
}

/// Stamps the EXIF capture date (and optionally a logo) and resizes to `w_max`.
#[derive(Default)]
pub struct OverlayResize {
    fonts: Mutex<HashMap<PathBuf, Arc<Font>>>,
}

impl std::fmt::Debug for OverlayResize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayResize")
            .field("cached_fonts", &self.fonts.lock().len())
            .finish()
    }
}

impl OverlayResize {
    /// Create a transform with an empty font cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn font(&self, path: &Path) -> Result<Arc<Font>, TransformError> {
        if let Some(font) = self.fonts.lock().get(path) {
            return Ok(Arc::clone(font));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| TransformError::Font(format!("{}: {e}", path.display())))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| TransformError::Font(format!("{}: {e}", path.display())))?;
        let font = Arc::new(font);

        self.fonts
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&font));
        Ok(font)
    }
}

impl ImageTransform for OverlayResize {
    fn apply(
        &self,
        source: &Path,
        output_dir: &Path,
        params: &TransformParams,
    ) -> Result<PathBuf, TransformError> {
        let width = target_width(params.w_max)?;
        let file_name = source.file_name().ok_or_else(|| TransformError::Open {
            path: source.display().to_string(),
            reason: "path has no file name".to_string(),
        })?;

        if !source.is_file() {
            return Err(TransformError::Open {
                path: source.display().to_string(),
                reason: "file not found".to_string(),
            });
        }

        let label = overlay_label(&capture_date(source)?);

        let mut canvas = image::open(source)
            .map_err(|e| TransformError::Open {
                path: source.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();

        if let Some(font_path) = &params.font_path {
            let font = self.font(font_path)?;
            let style = text_style(&canvas, params);
            draw_text(&mut canvas, &font, &label, style);
        }

        if let Some(logo_path) = &params.logo_path {
            let logo = image::open(logo_path)
                .map_err(|e| TransformError::Logo(format!("{}: {e}", logo_path.display())))?
                .to_rgba8();
            overlay_logo(&mut canvas, &logo, params.logo_padding);
        }

        let resized = resize_to_width(&canvas, width);
        let out_path = output_dir.join(file_name);

        DynamicImage::ImageRgba8(resized)
            .to_rgb8()
            .save(&out_path)
            .map_err(|e| TransformError::Save {
                path: out_path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(out_path)
    }
}

fn target_width(w_max: i64) -> Result<u32, TransformError> {
    u32::try_from(w_max)
        .ok()
        .filter(|w| *w > 0)
        .ok_or(TransformError::InvalidWidth(w_max))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn text_style(canvas: &RgbaImage, params: &TransformParams) -> TextStyle {
    let w = canvas.width() as f32;
    let left_border = (params.left_border_percent * w) as i32;
    TextStyle {
        px: params.font_scale * 10.0,
        x: canvas.width() as i32 - left_border,
        baseline: canvas.height() as i32 - params.bottom_border as i32,
        color: params.font_color,
    }
}

/// Resize keeping the aspect ratio: height follows width.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn resize_to_width(img: &RgbaImage, width: u32) -> RgbaImage {
    let ratio = f64::from(width) / f64::from(img.width().max(1));
    let height = ((f64::from(img.height()) * ratio) as u32).max(1);
    imageops::resize(img, width, height, FilterType::Triangle)
}
