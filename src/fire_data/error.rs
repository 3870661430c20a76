use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FireDataError {
    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Cache path exists but is not a directory: '{0}'")]
    CacheDirNotADirectory(PathBuf),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to parse CSV response")]
    CsvParse(#[source] PolarsError),

    #[error("Response is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Failed processing fire table: {0}")]
    FrameProcessing(#[from] PolarsError),
}
