//! Kernel density estimate of detections, drawn as banded filled contours.

use crate::render::colormap::Colormap;
use image::{Pixel, Rgba, RgbaImage};

/// Fraction of Scott's rule used as bandwidth. Small values keep hot spots tight.
pub const BANDWIDTH_ADJUST: f64 = 0.15;

/// Number of density bands. The lowest band is left transparent.
pub const LEVELS: usize = 10;

/// Opacity of the density layer.
pub const HEAT_ALPHA: f32 = 0.4;

/// A point in pixel space with a non-negative weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

/// Density on a pixel grid, unnormalised.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    pub width: u32,
    pub height: u32,
    values: Vec<f64>,
}

impl DensityGrid {
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[(y * self.width + x) as usize]
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Band of every cell, `0..LEVELS`, with the highest band at the peak.
    pub fn level(&self, x: u32, y: u32, max: f64) -> usize {
        if max <= 0.0 {
            return 0;
        }
        let fraction = self.get(x, y) / max;
        ((fraction * LEVELS as f64).floor() as usize).min(LEVELS - 1)
    }
}

/// Per-axis Gaussian bandwidth in pixels: `BANDWIDTH_ADJUST` × Scott's factor
/// × weighted standard deviation, with the effective sample size of the
/// weights.
pub fn bandwidth(points: &[WeightedPoint]) -> (f64, f64) {
    let total: f64 = points.iter().map(|p| p.weight).sum();
    if total <= 0.0 {
        return (1.0, 1.0);
    }
    let squares: f64 = points.iter().map(|p| p.weight * p.weight).sum();
    let n_eff = total * total / squares;
    let scott = n_eff.powf(-1.0 / 6.0);

    let mean_x = points.iter().map(|p| p.weight * p.x).sum::<f64>() / total;
    let mean_y = points.iter().map(|p| p.weight * p.y).sum::<f64>() / total;
    let var_x = points.iter().map(|p| p.weight * (p.x - mean_x).powi(2)).sum::<f64>() / total;
    let var_y = points.iter().map(|p| p.weight * (p.y - mean_y).powi(2)).sum::<f64>() / total;

    let sigma_x = (BANDWIDTH_ADJUST * scott * var_x.sqrt()).max(1.0);
    let sigma_y = (BANDWIDTH_ADJUST * scott * var_y.sqrt()).max(1.0);
    (sigma_x, sigma_y)
}

/// Sums a truncated (3σ) Gaussian kernel per point over a `width` × `height` grid.
pub fn density(points: &[WeightedPoint], width: u32, height: u32) -> DensityGrid {
    let mut values = vec![0.0; (width as usize) * (height as usize)];
    let (sx, sy) = bandwidth(points);
    let (rx, ry) = (3.0 * sx, 3.0 * sy);

    for p in points.iter().filter(|p| p.weight > 0.0) {
        let x0 = (p.x - rx).floor().max(0.0) as i64;
        let x1 = ((p.x + rx).ceil() as i64).min(width as i64 - 1);
        let y0 = (p.y - ry).floor().max(0.0) as i64;
        let y1 = ((p.y + ry).ceil() as i64).min(height as i64 - 1);
        for y in y0..=y1 {
            let dy = (y as f64 + 0.5 - p.y) / sy;
            for x in x0..=x1 {
                let dx = (x as f64 + 0.5 - p.x) / sx;
                let k = (-0.5 * (dx * dx + dy * dy)).exp();
                values[y as usize * width as usize + x as usize] += p.weight * k;
            }
        }
    }

    DensityGrid {
        width,
        height,
        values,
    }
}

/// Blends the banded density of `points` onto `image` at offset `(ox, oy)`.
/// Band `k` takes the colormap at `k / (LEVELS - 1)`.
pub fn draw_heat_layer(
    image: &mut RgbaImage,
    ox: u32,
    oy: u32,
    grid: &DensityGrid,
    colormap: Colormap,
) {
    let max = grid.max();
    if max <= 0.0 {
        return;
    }
    let alpha = (HEAT_ALPHA * 255.0).round() as u8;
    let palette: Vec<Rgba<u8>> = (0..LEVELS)
        .map(|k| {
            let mut c = colormap.sample(k as f32 / (LEVELS - 1) as f32);
            c.0[3] = alpha;
            c
        })
        .collect();

    for y in 0..grid.height {
        for x in 0..grid.width {
            let level = grid.level(x, y, max);
            if level == 0 {
                continue;
            }
            let (px, py) = (ox + x, oy + y);
            if px < image.width() && py < image.height() {
                image.get_pixel_mut(px, py).blend(&palette[level]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> WeightedPoint {
        WeightedPoint { x, y, weight: 1.0 }
    }

    #[test]
    fn density_peaks_at_the_cluster() {
        let points = [point(20.0, 20.0), point(21.0, 20.0), point(20.0, 21.0), point(80.0, 80.0)];
        let grid = density(&points, 100, 100);
        assert!(grid.get(20, 20) > grid.get(80, 80));
        assert!(grid.get(50, 5) < 1e-6);
        assert_eq!(grid.level(20, 20, grid.max()), LEVELS - 1);
        assert_eq!(grid.level(50, 5, grid.max()), 0);
    }

    #[test]
    fn zero_weights_produce_no_density() {
        let points = [WeightedPoint { x: 5.0, y: 5.0, weight: 0.0 }; 3];
        let grid = density(&points, 10, 10);
        assert_eq!(grid.max(), 0.0);
    }

    #[test]
    fn bandwidth_shrinks_with_more_points() {
        let few: Vec<_> = (0..4).map(|i| point(i as f64 * 50.0, i as f64 * 50.0)).collect();
        let many: Vec<_> = (0..400).map(|i| point((i % 4) as f64 * 50.0, (i % 4) as f64 * 50.0)).collect();
        assert!(bandwidth(&many).0 < bandwidth(&few).0);
    }

    #[test]
    fn lowest_band_stays_transparent() {
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([43, 43, 43, 255]));
        let points = [point(10.0, 10.0), point(11.0, 10.0), point(10.0, 11.0)];
        let grid = density(&points, 40, 40);
        draw_heat_layer(&mut image, 0, 0, &grid, Colormap::Gnuplot2);
        assert_eq!(image.get_pixel(39, 39), &Rgba([43, 43, 43, 255]));
        assert_ne!(image.get_pixel(10, 10), &Rgba([43, 43, 43, 255]));
    }
}
