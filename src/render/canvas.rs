//! Alpha-blended drawing primitives on top of `imageproc`.

use crate::render::viewport::PixelArea;
use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, Blend};
use imageproc::rect::Rect;

/// Dark-mode background.
pub const BACKGROUND: Rgba<u8> = Rgba([0x2b, 0x2b, 0x2b, 255]);

/// A frame being drawn. Fills and dots blend with what is underneath.
pub struct FrameCanvas {
    target: Blend<RgbaImage>,
}

impl FrameCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: Blend(RgbaImage::from_pixel(width, height, BACKGROUND)),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.target.0
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.target.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.target.0
    }

    /// Copies `source` into `area`, cropping whatever does not fit.
    pub fn paste(&mut self, source: &RgbaImage, area: &PixelArea) {
        let image = &mut self.target.0;
        for (x, y, pixel) in source.enumerate_pixels() {
            let (px, py) = (area.x + x, area.y + y);
            if x < area.width && y < area.height && px < image.width() && py < image.height() {
                image.put_pixel(px, py, *pixel);
            }
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
        if width == 0 || height == 0 {
            return;
        }
        draw_filled_rect_mut(&mut self.target, Rect::at(x, y).of_size(width, height), color);
    }

    /// Border of `thickness` pixels drawn just inside the rectangle. The
    /// four strips do not overlap.
    pub fn frame_rect(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        thickness: u32,
        color: Rgba<u8>,
    ) {
        let t = thickness.min(width / 2).min(height / 2);
        let inner = height.saturating_sub(2 * t);
        self.fill_rect(x, y, width, t, color);
        self.fill_rect(x, y + (height - t) as i32, width, t, color);
        self.fill_rect(x, y + t as i32, t, inner, color);
        self.fill_rect(x + (width - t) as i32, y + t as i32, t, inner, color);
    }

    /// Filled disc; every covered pixel is blended exactly once.
    pub fn dot(&mut self, center: (f32, f32), radius: f32, color: Rgba<u8>) {
        let image = &mut self.target.0;
        let r = radius.max(0.5);
        let (width, height) = (image.width() as i64, image.height() as i64);
        let x0 = (center.0 - r).floor().max(0.0) as i64;
        let x1 = ((center.0 + r).ceil() as i64).min(width - 1);
        let y0 = (center.1 - r).floor().max(0.0) as i64;
        let y1 = ((center.1 + r).ceil() as i64).min(height - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - center.0;
                let dy = y as f32 + 0.5 - center.1;
                if dx * dx + dy * dy <= r * r {
                    image.get_pixel_mut(x as u32, y as u32).blend(&color);
                }
            }
        }
    }

    /// Strokes a closed ring `width` pixels wide. Strokes overwrite rather
    /// than blend, so overlapping passes do not darken.
    pub fn ring(&mut self, points: &[(f32, f32)], width: f32, color: Rgba<u8>) {
        if points.len() < 2 {
            return;
        }
        let half = (width / 2.0).max(0.5);
        for segment in points.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            let length = (dx * dx + dy * dy).sqrt();
            if length == 0.0 {
                continue;
            }
            let (nx, ny) = (-dy / length, dx / length);
            let mut offset = -half;
            while offset <= half {
                draw_line_segment_mut(
                    &mut self.target.0,
                    (a.0 + nx * offset, a.1 + ny * offset),
                    (b.0 + nx * offset, b.1 + ny * offset),
                    color,
                );
                offset += 0.5;
            }
        }
        for &(x, y) in points {
            self.dot((x, y), half, color);
        }
    }
}
