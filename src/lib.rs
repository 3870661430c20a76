mod config;
mod error;
mod fire_data;
mod render;
mod spatial;
mod timelapse;
mod types;
mod utils;
mod video;

pub use config::{
    resolve_map_key, resolve_map_key_in, validate_dates, Cli, ConfigError, RunConfig,
    MAP_KEY_ENV,
};
pub use error::TimelapseError;
pub use timelapse::{FireTimelapse, RenderedRun, TimelapseReport};

pub use fire_data::cache_store::{is_no_data, CacheEntry, CacheKey, CacheStore, NO_DATA_SENTINEL};
pub use fire_data::error::FireDataError;
pub use fire_data::executor::{
    FirmsEndpoint, RequestExecutor, RetryPolicy, DEFAULT_SOURCE, FIRMS_AREA_API,
};
pub use fire_data::fire_table::{FirePoint, FireTable};
pub use fire_data::orchestrator::{FetchOrchestrator, FetchOutcome};
pub use fire_data::planner::{plan, plan_firms_chunks, FIRMS_CHUNK_LIMIT_DAYS, YEARLY_BATCH_DAYS};
pub use fire_data::rate_limiter::RateLimiter;
pub use fire_data::transport::{FirmsTransport, HttpTransport, TransportError};

pub use spatial::aoi::Aoi;
pub use spatial::clip::{clip_to_aoi, ClippedFires};
pub use spatial::error::SpatialError;

pub use render::basemap::{Basemap, BasemapStyle};
pub use render::colormap::Colormap;
pub use render::error::RenderError;
pub use render::frames::{FrameRenderer, RenderedFrame};
pub use render::viewport::{FrameLayout, Projection, Viewport};

pub use types::bbox::BoundingBox;
pub use types::chunk_result::{ChunkFailure, ChunkOutcome, ChunkResult, RunSummary};
pub use types::date_range::{Chunk, DateRange};
pub use types::frame_interval::{FrameInterval, Period, WeightBy};

pub use video::{output_file_name, VideoAssembler, VideoError};
