use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create frame directory '{0}'")]
    FrameDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write frame '{0}'")]
    FrameWrite(PathBuf, #[source] image::ImageError),

    #[error("Failed to build basemap HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Basemap tile request failed for {0}")]
    TileRequest(String, #[source] reqwest::Error),

    #[error("Failed to decode basemap tile {0}")]
    TileDecode(String, #[source] image::ImageError),

    #[error("Basemap would need {needed} tiles, more than the limit of {limit}")]
    TooManyTiles { needed: usize, limit: usize },

    #[error("Invalid frame font")]
    Font(#[from] ab_glyph::InvalidFont),

    #[error("Font size {0} pt is not usable")]
    FontSize(f32),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
