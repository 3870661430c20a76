//! The area of interest: the operator's polygon, in WGS84 degrees.

use crate::spatial::error::SpatialError;
use crate::types::bbox::BoundingBox;
use geo::{
    BoundingRect, Centroid, Geometry, GeometryCollection, Intersects, MultiPolygon, Point, Polygon,
};
use geojson::GeoJson;
use log::info;
use std::io;
use std::path::Path;

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.32;

/// Default distance the request box is grown by around the AOI.
pub const DEFAULT_BUFFER_KM: f64 = 25.0;

/// A loaded area of interest.
#[derive(Debug, Clone)]
pub struct Aoi {
    name: String,
    geometry: MultiPolygon<f64>,
    bounds: BoundingBox,
}

impl Aoi {
    /// Reads a GeoJSON file (FeatureCollection, Feature or bare Geometry).
    /// The AOI is named after the file stem.
    ///
    /// Coordinates are taken as WGS84 longitude/latitude.
    pub async fn load(path: &Path) -> Result<Self, SpatialError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SpatialError::AoiNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(SpatialError::AoiRead(path.to_path_buf(), e)),
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "aoi".to_string());

        let aoi = Self::from_geojson_str(name, &text)?;
        info!(
            "Loaded AOI '{}' with {} polygon(s), bounds {}",
            aoi.name,
            aoi.geometry.0.len(),
            aoi.bounds
        );
        Ok(aoi)
    }

    /// Keeps every Polygon and MultiPolygon in the document; other geometry
    /// kinds are ignored.
    pub fn from_geojson_str(name: impl Into<String>, text: &str) -> Result<Self, SpatialError> {
        let geojson: GeoJson = text.parse()?;
        let collection = GeometryCollection::<f64>::try_from(&geojson)?;

        let mut polygons = Vec::new();
        for geometry in collection {
            collect_polygons(geometry, &mut polygons);
        }
        Self::from_polygons(name, polygons)
    }

    pub fn from_polygons(
        name: impl Into<String>,
        polygons: Vec<Polygon<f64>>,
    ) -> Result<Self, SpatialError> {
        let geometry = MultiPolygon::new(polygons);
        let rect = geometry.bounding_rect().ok_or(SpatialError::NoPolygon)?;
        let bounds = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        Ok(Self {
            name: name.into(),
            geometry,
            bounds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Tight bounds of the polygons.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Centroid (lon, lat), falling back to the centre of the bounds.
    pub fn centroid(&self) -> (f64, f64) {
        self.geometry
            .centroid()
            .map(|p| (p.x(), p.y()))
            .unwrap_or_else(|| self.bounds.center())
    }

    /// The box sent to the API: the AOI bounds grown by `buffer_km` on every
    /// side. Longitude degrees are scaled by the cosine of the centroid's
    /// latitude.
    pub fn request_bbox(&self, buffer_km: f64) -> BoundingBox {
        let (_, lat) = self.centroid();
        let dy = buffer_km / KM_PER_DEGREE;
        let cos_lat = lat.to_radians().cos().max(0.01);
        let dx = buffer_km / (KM_PER_DEGREE * cos_lat);
        self.bounds.expand(dx, dy)
    }

    /// Point-in-AOI test, boundary included.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        self.geometry.intersects(&Point::new(lon, lat))
    }
}

fn collect_polygons(geometry: Geometry<f64>, polygons: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => polygons.push(polygon),
        Geometry::MultiPolygon(multi) => polygons.extend(multi),
        Geometry::GeometryCollection(collection) => {
            for inner in collection {
                collect_polygons(inner, polygons);
            }
        }
        _ => {}
    }
}
