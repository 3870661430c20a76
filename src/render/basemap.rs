//! Background imagery from XYZ web tiles, fetched once per run.

use crate::render::error::RenderError;
use crate::render::viewport::{Viewport, EARTH_RADIUS_M};
use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info};
use reqwest::Client;
use std::f64::consts::PI;
use std::time::Duration;

pub const TILE_SIZE: u32 = 256;

/// Upper bound on tiles fetched for one basemap.
pub const MAX_TILES: usize = 64;

pub const MAX_ZOOM: u8 = 18;

const TILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Background of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum BasemapStyle {
    /// Plain dark background, map drawn in lon/lat.
    None,
    /// OpenStreetMap standard tiles.
    Osm,
    /// Esri World Imagery.
    #[default]
    Satellite,
    /// Stamen Terrain (served by Stadia Maps).
    Terrain,
}

impl BasemapStyle {
    pub fn tile_template(&self) -> Option<&'static str> {
        match self {
            BasemapStyle::None => None,
            BasemapStyle::Osm => Some("https://tile.openstreetmap.org/{z}/{x}/{y}.png"),
            BasemapStyle::Satellite => Some(
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            ),
            BasemapStyle::Terrain => {
                Some("https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png")
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, BasemapStyle::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// Inclusive block of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl TileRange {
    /// Tiles covering a Web Mercator viewport at zoom `z`.
    pub fn covering(viewport: &Viewport, z: u8) -> Self {
        let last = (1u32 << z) - 1;
        let clamp = |v: f64| (v.floor().max(0.0) as u32).min(last);
        Self {
            z,
            x0: clamp(tile_x(viewport.min_x, z)),
            x1: clamp(tile_x(viewport.max_x, z)),
            y0: clamp(tile_y(viewport.max_y, z)),
            y1: clamp(tile_y(viewport.min_y, z)),
        }
    }

    pub fn columns(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn rows(&self) -> u32 {
        self.y1 - self.y0 + 1
    }

    pub fn count(&self) -> usize {
        (self.columns() * self.rows()) as usize
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        (self.y0..=self.y1)
            .flat_map(move |y| (self.x0..=self.x1).map(move |x| TileId { z: self.z, x, y }))
    }

    /// The deepest zoom within [`MAX_TILES`], stopping once the tiles resolve
    /// `width_px` pixels across the viewport.
    pub fn for_viewport(viewport: &Viewport, width_px: u32) -> Self {
        let mut best = Self::covering(viewport, 0);
        for z in 1..=MAX_ZOOM {
            let range = Self::covering(viewport, z);
            if range.count() > MAX_TILES {
                break;
            }
            best = range;
            let resolved = viewport.width() / (2.0 * PI * EARTH_RADIUS_M)
                * (1u64 << z) as f64
                * TILE_SIZE as f64;
            if resolved >= width_px as f64 {
                break;
            }
        }
        best
    }
}

/// Fractional tile column of Web Mercator `x` at zoom `z`.
fn tile_x(x: f64, z: u8) -> f64 {
    (x + PI * EARTH_RADIUS_M) / (2.0 * PI * EARTH_RADIUS_M) * (1u64 << z) as f64
}

/// Fractional tile row of Web Mercator `y` at zoom `z`.
fn tile_y(y: f64, z: u8) -> f64 {
    (PI * EARTH_RADIUS_M - y) / (2.0 * PI * EARTH_RADIUS_M) * (1u64 << z) as f64
}

/// Background imagery already cut and scaled to the map area.
#[derive(Debug, Clone)]
pub struct Basemap {
    image: RgbaImage,
}

impl Basemap {
    /// Fetches the tiles under `viewport` (Web Mercator, already fitted to
    /// the map area) and scales them to `width` × `height`.
    pub async fn fetch(
        style: BasemapStyle,
        viewport: &Viewport,
        width: u32,
        height: u32,
    ) -> Result<Option<Self>, RenderError> {
        let Some(template) = style.tile_template() else {
            return Ok(None);
        };
        let range = TileRange::for_viewport(viewport, width);
        if range.count() > MAX_TILES {
            return Err(RenderError::TooManyTiles {
                needed: range.count(),
                limit: MAX_TILES,
            });
        }
        info!(
            "Fetching {} {:?} basemap tiles at zoom {}",
            range.count(),
            style,
            range.z
        );

        let client = Client::builder()
            .timeout(TILE_TIMEOUT)
            .user_agent(concat!("fire_timelapse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RenderError::HttpClient)?;

        let mut tiles = Vec::with_capacity(range.count());
        for tile in range.tiles() {
            let url = tile.url(template);
            debug!("Fetching tile {}", url);
            let bytes = client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| RenderError::TileRequest(url.clone(), e))?
                .bytes()
                .await
                .map_err(|e| RenderError::TileRequest(url.clone(), e))?;
            let image = image::load_from_memory(&bytes)
                .map_err(|e| RenderError::TileDecode(url, e))?
                .to_rgba8();
            tiles.push((tile, image));
        }

        Ok(Some(Self::compose(&range, &tiles, viewport, width, height)))
    }

    /// Stitches `tiles` of `range` and cuts out `viewport` at `width` × `height`.
    /// Missing tiles stay transparent.
    pub fn compose(
        range: &TileRange,
        tiles: &[(TileId, RgbaImage)],
        viewport: &Viewport,
        width: u32,
        height: u32,
    ) -> Self {
        let mut mosaic = RgbaImage::new(range.columns() * TILE_SIZE, range.rows() * TILE_SIZE);
        for (tile, image) in tiles {
            if tile.x < range.x0 || tile.x > range.x1 || tile.y < range.y0 || tile.y > range.y1 {
                continue;
            }
            let scaled;
            let image = if image.dimensions() == (TILE_SIZE, TILE_SIZE) {
                image
            } else {
                scaled = imageops::resize(image, TILE_SIZE, TILE_SIZE, FilterType::Triangle);
                &scaled
            };
            let x = ((tile.x - range.x0) * TILE_SIZE) as i64;
            let y = ((tile.y - range.y0) * TILE_SIZE) as i64;
            imageops::replace(&mut mosaic, image, x, y);
        }

        let to_px = |tile: f64, origin: u32| (tile - origin as f64) * TILE_SIZE as f64;
        let left = to_px(tile_x(viewport.min_x, range.z), range.x0).max(0.0);
        let right = to_px(tile_x(viewport.max_x, range.z), range.x0).min(mosaic.width() as f64);
        let top = to_px(tile_y(viewport.max_y, range.z), range.y0).max(0.0);
        let bottom = to_px(tile_y(viewport.min_y, range.z), range.y0).min(mosaic.height() as f64);

        let crop_w = ((right - left).round() as u32).max(1);
        let crop_h = ((bottom - top).round() as u32).max(1);
        let cropped =
            imageops::crop_imm(&mosaic, left as u32, top as u32, crop_w, crop_h).to_image();
        Self {
            image: imageops::resize(&cropped, width.max(1), height.max(1), FilterType::Triangle),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}
