use crate::fire_data::error::FireDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("GeoJSON file not found: '{0}'")]
    AoiNotFound(PathBuf),

    #[error("Failed to read GeoJSON file '{0}'")]
    AoiRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse GeoJSON")]
    GeoJson(#[from] geojson::Error),

    #[error("Area of interest contains no polygon")]
    NoPolygon,

    #[error(transparent)]
    FireData(#[from] FireDataError),
}
