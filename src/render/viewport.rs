//! Map extent of the frames and the pixel layout of a frame.

use crate::spatial::aoi::Aoi;
use crate::types::frame_interval::FrameInterval;
use std::f64::consts::PI;

/// WGS84 semi-major axis, the Web Mercator sphere radius (m).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Degrees of buffer per kilometre when the map stays in lon/lat
/// (25 km → 0.225°).
pub const LONLAT_DEGREES_PER_KM: f64 = 0.009;

/// Padding added on every side of the buffered extent.
pub const VIEW_PADDING: f64 = 0.08;

/// Frames are 12 × 10 inches.
pub const FRAME_WIDTH_IN: f64 = 12.0;
pub const FRAME_HEIGHT_IN: f64 = 10.0;

pub const DEFAULT_DPI: u32 = 80;

/// Coordinate system the map is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Plain longitude/latitude degrees.
    LonLat,
    /// EPSG:3857 metres, used under web tiles.
    WebMercator,
}

impl Projection {
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::LonLat => (lon, lat),
            Projection::WebMercator => {
                let lat = lat.clamp(-85.051_128_78, 85.051_128_78);
                let x = EARTH_RADIUS_M * lon.to_radians();
                let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
        }
    }
}

/// A projected extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub projection: Projection,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Viewport {
    /// The AOI extent grown by the buffer (degrees in lon/lat, metres in Web
    /// Mercator) and then padded by [`VIEW_PADDING`] on every side.
    pub fn around(aoi: &Aoi, projection: Projection, buffer_km: f64) -> Self {
        let bounds = aoi.bounds();
        let (x0, y0) = projection.project(bounds.west, bounds.south);
        let (x1, y1) = projection.project(bounds.east, bounds.north);
        let buffer = match projection {
            Projection::LonLat => buffer_km * LONLAT_DEGREES_PER_KM,
            Projection::WebMercator => buffer_km * 1000.0,
        };
        let (min_x, min_y, max_x, max_y) = (x0 - buffer, y0 - buffer, x1 + buffer, y1 + buffer);
        let pad_x = (max_x - min_x) * VIEW_PADDING;
        let pad_y = (max_y - min_y) * VIEW_PADDING;
        Self {
            projection,
            min_x: min_x - pad_x,
            min_y: min_y - pad_y,
            max_x: max_x + pad_x,
            max_y: max_y + pad_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows the shorter side around the centre so one map unit has the same
    /// length on both axes of an area of `width` × `height` pixels.
    pub fn fit_aspect(&self, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 || self.width() <= 0.0 || self.height() <= 0.0 {
            return *self;
        }
        let target = width as f64 / height as f64;
        let current = self.width() / self.height();
        let (cx, cy) = (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        );
        let (half_w, half_h) = if current < target {
            (self.height() * target / 2.0, self.height() / 2.0)
        } else {
            (self.width() / 2.0, self.width() / target / 2.0)
        };
        Self {
            projection: self.projection,
            min_x: cx - half_w,
            min_y: cy - half_h,
            max_x: cx + half_w,
            max_y: cy + half_h,
        }
    }

    /// Pixel position of projected point `(x, y)` inside `area`.
    pub fn to_pixel(&self, area: &PixelArea, x: f64, y: f64) -> (f32, f32) {
        let px = area.x as f64 + (x - self.min_x) / self.width() * area.width as f64;
        let py = area.y as f64 + (self.max_y - y) / self.height() * area.height as f64;
        (px as f32, py as f32)
    }

    /// Projected coordinates at the centre of pixel `(px, py)` of an area
    /// of `width` × `height`.
    pub fn from_pixel(&self, width: u32, height: u32, px: u32, py: u32) -> (f64, f64) {
        let x = self.min_x + (px as f64 + 0.5) / width as f64 * self.width();
        let y = self.max_y - (py as f64 + 0.5) / height as f64 * self.height();
        (x, y)
    }

    pub fn lonlat_to_pixel(&self, area: &PixelArea, lon: f64, lat: f64) -> (f32, f32) {
        let (x, y) = self.projection.project(lon, lat);
        self.to_pixel(area, x, y)
    }
}

/// A rectangle of the frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where the map and (for monthly frames) the bar chart go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub map: PixelArea,
    pub bars: Option<PixelArea>,
}

impl FrameLayout {
    /// 12 × 10 inches at `dpi`, rounded up to even pixel counts for H.264.
    pub fn new(dpi: u32, interval: FrameInterval) -> Self {
        let dpi = dpi.max(1) as f64;
        let width = even((FRAME_WIDTH_IN * dpi).round() as u32);
        let height = even((FRAME_HEIGHT_IN * dpi).round() as u32);
        let fw = width as f64;
        let fh = height as f64;

        match interval {
            FrameInterval::Daily => {
                let pad = (0.02 * fh).round() as u32;
                FrameLayout {
                    width,
                    height,
                    map: PixelArea {
                        x: pad,
                        y: pad,
                        width: width.saturating_sub(2 * pad),
                        height: height.saturating_sub(2 * pad),
                    },
                    bars: None,
                }
            }
            FrameInterval::Monthly => {
                // map and bar strip share the inner 84 % of the height at 8:1
                let left = (0.05 * fw).round() as u32;
                let inner_width = width.saturating_sub(2 * left);
                let top = 0.05 * fh;
                let gap = 0.03 * fh;
                let usable = fh * 0.87 - gap;
                let map_height = (usable * 8.0 / 9.0).round() as u32;
                let bar_height = (usable / 9.0).round() as u32;
                let map = PixelArea {
                    x: left,
                    y: top.round() as u32,
                    width: inner_width,
                    height: map_height,
                };
                let bars = PixelArea {
                    x: left,
                    y: map.y + map_height + gap.round() as u32,
                    width: inner_width,
                    height: bar_height,
                };
                FrameLayout {
                    width,
                    height,
                    map,
                    bars: Some(bars),
                }
            }
        }
    }
}

fn even(n: u32) -> u32 {
    n.max(2) + n.max(2) % 2
}
