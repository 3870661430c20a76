use crate::config::ConfigError;
use crate::fire_data::error::FireDataError;
use crate::render::error::RenderError;
use crate::spatial::error::SpatialError;
use crate::video::VideoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    FireData(#[from] FireDataError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Video(#[from] VideoError),
}
