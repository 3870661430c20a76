//! Frame text: the stats box, bar chart ticks and axis labels, set in the
//! bundled DejaVu Sans Mono.

use crate::render::error::RenderError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

const FONT_DATA: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/DejaVuSansMono.ttf"
));

/// The frame font at a given resolution.
pub struct FrameFont {
    font: FontRef<'static>,
    dpi: f32,
}

impl FrameFont {
    pub fn load(dpi: u32) -> Result<Self, RenderError> {
        Ok(Self {
            font: FontRef::try_from_slice(FONT_DATA)?,
            dpi: dpi.max(1) as f32,
        })
    }

    /// Pixel scale of a `pt_size` font at the frame's dpi.
    pub fn scale(&self, pt_size: f32) -> Result<PxScale, RenderError> {
        // ab_glyph converts points at 96 dpi
        self.font
            .pt_to_px_scale(pt_size * self.dpi / 96.0)
            .ok_or(RenderError::FontSize(pt_size))
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self, scale: PxScale) -> u32 {
        let scaled = self.font.as_scaled(scale);
        (scaled.height() + scaled.line_gap()).ceil() as u32
    }

    pub fn text_width(&self, scale: PxScale, text: &str) -> u32 {
        text_size(scale, &self.font, text).0
    }

    /// Draws one line with the top of the line box at `y`.
    pub fn draw(
        &self,
        image: &mut RgbaImage,
        (x, y): (i32, i32),
        scale: PxScale,
        color: Rgba<u8>,
        text: &str,
    ) {
        draw_text_mut(image, color, x, y, scale, &self.font, text);
    }

    /// Draws one line reading bottom to top. `(x, y)` is the top-left corner
    /// of the rotated line box.
    pub fn draw_vertical(
        &self,
        image: &mut RgbaImage,
        (x, y): (i32, i32),
        scale: PxScale,
        color: Rgba<u8>,
        text: &str,
    ) {
        let width = self.text_width(scale, text) + 2;
        let height = self.line_height(scale).max(1);
        let mut strip = RgbaImage::new(width, height);
        draw_text_mut(&mut strip, Rgba([255; 4]), 1, 0, scale, &self.font, text);
        // the alpha channel now holds glyph coverage
        for pixel in strip.pixels_mut() {
            let alpha = (pixel.0[3] as u16 * color.0[3] as u16 / 255) as u8;
            *pixel = Rgba([color.0[0], color.0[1], color.0[2], alpha]);
        }
        let rotated = imageops::rotate270(&strip);
        imageops::overlay(image, &rotated, x as i64, y as i64);
    }
}

/// `1234567` as `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
