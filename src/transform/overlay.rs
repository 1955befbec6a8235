//! Text and logo overlays drawn onto an RGBA canvas.

use fontdue::Font;
use image::{imageops, Rgba, RgbaImage};

/// Black outline drawn behind the text, in pixels per side.
fn outline_width(px: f32) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let w = (px / 20.0).round() as i32;
    w.max(1)
}

/// Placement and styling of a text overlay.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Glyph height in pixels.
    pub px: f32,
    /// Left edge of the text.
    pub x: i32,
    /// Baseline of the text.
    pub baseline: i32,
    /// Fill colour.
    pub color: [u8; 3],
}

/// Draw `text` with a black outline.
pub fn draw_text(canvas: &mut RgbaImage, font: &Font, text: &str, style: TextStyle) {
    let outline = outline_width(style.px);
    for dy in -outline..=outline {
        for dx in -outline..=outline {
            if dx != 0 || dy != 0 {
                draw_glyphs(canvas, font, text, style, (dx, dy), [0, 0, 0]);
            }
        }
    }
    draw_glyphs(canvas, font, text, style, (0, 0), style.color);
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn draw_glyphs(
    canvas: &mut RgbaImage,
    font: &Font,
    text: &str,
    style: TextStyle,
    offset: (i32, i32),
    color: [u8; 3],
) {
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    let mut pen_x = style.x as f32;

    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, style.px);
        let left = pen_x.round() as i32 + metrics.xmin + offset.0;
        let top = style.baseline - metrics.height as i32 - metrics.ymin + offset.1;

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                let (x, y) = (left + gx as i32, top + gy as i32);
                if x < 0 || y < 0 || x >= width || y >= height {
                    continue;
                }
                blend(canvas.get_pixel_mut(x as u32, y as u32), color, coverage);
            }
        }

        pen_x += metrics.advance_width;
    }
}

fn blend(pixel: &mut Rgba<u8>, color: [u8; 3], coverage: u8) {
    let a = u16::from(coverage);
    for (dst, src) in pixel.0.iter_mut().zip(color) {
        let mixed = (u16::from(src) * a + u16::from(*dst) * (255 - a)) / 255;
        // mixed <= 255 by construction
        *dst = u8::try_from(mixed).unwrap_or(u8::MAX);
    }
}

/// Draw `logo` in the bottom-right corner, `padding` pixels from the edges.
pub fn overlay_logo(canvas: &mut RgbaImage, logo: &RgbaImage, padding: u32) {
    let x = i64::from(canvas.width()) - i64::from(logo.width()) - i64::from(padding);
    let y = i64::from(canvas.height()) - i64::from(logo.height()) - i64::from(padding);
    imageops::overlay(canvas, logo, x, y);
}
