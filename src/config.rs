//! Command line, validated run settings and credential lookup.

use crate::fire_data::executor::{DEFAULT_SOURCE, FIRMS_AREA_API};
use crate::render::basemap::BasemapStyle;
use crate::render::colormap::Colormap;
use crate::render::viewport::DEFAULT_DPI;
use crate::spatial::aoi::DEFAULT_BUFFER_KM;
use crate::types::date_range::DateRange;
use crate::types::frame_interval::{FrameInterval, WeightBy};
use crate::utils::DEFAULT_CACHE_DIR;
use crate::video::DEFAULT_FPS;
use chrono::{Days, NaiveDate};
use clap::Parser;
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAP_KEY_ENV: &str = "FIRMS_MAP_KEY";
pub const MAP_KEY_SIGNUP_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api/map_key/";
pub const DEFAULT_VIDEO_DIR: &str = "outputs/videos";
pub const DEFAULT_FRAMES_DIR: &str = "outputs/frames_frequency";

/// MODIS_SP is published with a delay of roughly this many days.
pub const PROCESSING_DELAY_DAYS: u64 = 60;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The part of `config.json` this tool reads.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "MAP_KEY")]
    map_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "NASA FIRMS MAP_KEY not configured!\n\n\
         Please set the MAP_KEY using one of these methods:\n  \
         1. Create .env file: FIRMS_MAP_KEY=your_key_here\n  \
         2. Environment variable: export FIRMS_MAP_KEY='your_key_here'\n  \
         3. Create config.json: {{\"MAP_KEY\": \"your_key_here\"}}\n\n\
         Get your free MAP_KEY at: {MAP_KEY_SIGNUP_URL}"
    )]
    MissingMapKey,

    #[error("Invalid date '{value}'. Use YYYY-MM-DD")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Start date {start} must not be after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("Error reading env file '{0}'")]
    EnvFile(PathBuf, #[source] dotenvy::Error),

    #[error("Error reading config file '{0}'")]
    ConfigFileRead(PathBuf, #[source] std::io::Error),

    #[error("Error parsing config file '{0}'")]
    ConfigFileParse(PathBuf, #[source] serde_json::Error),
}

/// Generate fire activity timelapse videos from NASA FIRMS data.
#[derive(Debug, Clone, Parser)]
#[command(name = "fire-timelapse", version, about)]
pub struct Cli {
    /// GeoJSON file defining the area of interest.
    pub aoi_file: PathBuf,

    /// First day, YYYY-MM-DD.
    pub start_date: String,

    /// Last day (inclusive), YYYY-MM-DD.
    pub end_date: String,

    /// Output video path. Only its directory is used; the file is named
    /// OUTPUT_{start}_{end}_{aoi}.mp4 (default: outputs/videos/).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Frames per second.
    #[arg(long, default_value_t = DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Cache API responses on disk and reuse them on later runs.
    #[arg(long)]
    pub cache: bool,

    /// Keep the rendered frames after the video is written.
    #[arg(long)]
    pub keep_frames: bool,

    /// Map background.
    #[arg(long, value_enum, ignore_case = true, default_value_t = BasemapStyle::Satellite)]
    pub basemap: BasemapStyle,

    /// Frame grouping.
    #[arg(long, value_enum, ignore_case = true, default_value_t = FrameInterval::Monthly)]
    pub interval: FrameInterval,

    /// Frame resolution; frames are 12 × 10 inches.
    #[arg(long, default_value_t = DEFAULT_DPI, value_parser = clap::value_parser!(u32).range(10..=600))]
    pub dpi: u32,

    /// Heat weighting.
    #[arg(long, value_enum, ignore_case = true, default_value_t = WeightBy::Count)]
    pub weight_by: WeightBy,

    /// Heat colormap.
    #[arg(long, value_enum, ignore_case = true, default_value_t = Colormap::Gnuplot2)]
    pub colormap: Colormap,

    /// FIRMS data source.
    #[arg(long, default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Distance (km) the request box extends beyond the AOI.
    #[arg(long, default_value_t = DEFAULT_BUFFER_KM)]
    pub buffer_km: f64,

    /// Directory of cached API responses.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Directory the frames are rendered into.
    #[arg(long, default_value = DEFAULT_FRAMES_DIR)]
    pub frames_dir: PathBuf,

    /// FIRMS area API base URL.
    #[arg(long, default_value = FIRMS_AREA_API, hide = true)]
    pub api_url: String,
}

/// Validated settings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub aoi_file: PathBuf,
    pub range: DateRange,
    pub output_dir: PathBuf,
    pub fps: u32,
    pub use_cache: bool,
    pub keep_frames: bool,
    pub basemap: BasemapStyle,
    pub interval: FrameInterval,
    pub dpi: u32,
    pub weight_by: WeightBy,
    pub colormap: Colormap,
    pub source: String,
    pub buffer_km: f64,
    pub cache_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub api_url: String,
}

impl RunConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let today = chrono::Local::now().date_naive();
        let range = validate_dates(&cli.start_date, &cli.end_date, today)?;
        let output_dir = match cli.output.as_deref().and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            Some(_) => PathBuf::from("."),
            None => PathBuf::from(DEFAULT_VIDEO_DIR),
        };

        Ok(Self {
            aoi_file: cli.aoi_file,
            range,
            output_dir,
            fps: cli.fps,
            use_cache: cli.cache,
            keep_frames: cli.keep_frames,
            basemap: cli.basemap,
            interval: cli.interval,
            dpi: cli.dpi,
            weight_by: cli.weight_by,
            colormap: cli.colormap,
            source: cli.source,
            buffer_km: cli.buffer_km.max(0.0),
            cache_dir: cli.cache_dir,
            frames_dir: cli.frames_dir,
            api_url: cli.api_url,
        })
    }
}

/// Parses both dates and checks `start <= end`. Warns when `end` is so
/// recent that the science-quality product may not cover it yet.
pub fn validate_dates(start: &str, end: &str, today: NaiveDate) -> Result<DateRange, ConfigError> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;
    let range = DateRange::new(start_date, end_date).ok_or(ConfigError::StartAfterEnd {
        start: start_date,
        end: end_date,
    })?;

    if let Some(threshold) = today.checked_sub_days(Days::new(PROCESSING_DELAY_DAYS)) {
        if end_date > threshold {
            warn!("MODIS_SP data has a 2-3 month processing delay.");
            warn!("Recent dates (after ~{}) may have no data.", threshold);
        }
    }
    Ok(range)
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|source| {
        ConfigError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

/// Looks the map key up in the process environment, then `./.env`, then
/// `./config.json`.
pub fn resolve_map_key() -> Result<String, ConfigError> {
    resolve_map_key_in(std::env::var(MAP_KEY_ENV).ok(), Path::new("."))
}

/// [`resolve_map_key`] with an explicit environment value and directory.
/// Unreadable `.env` or `config.json` files are logged and skipped.
pub fn resolve_map_key_in(env_value: Option<String>, dir: &Path) -> Result<String, ConfigError> {
    non_empty(env_value)
        .or_else(|| non_empty(skip_unreadable(read_env_file(&dir.join(".env")))))
        .or_else(|| non_empty(skip_unreadable(read_config_json(&dir.join("config.json")))))
        .ok_or(ConfigError::MissingMapKey)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn skip_unreadable(result: Result<Option<String>, ConfigError>) -> Option<String> {
    result.unwrap_or_else(|e| {
        warn!("{}", e);
        None
    })
}

/// The `FIRMS_MAP_KEY` entry of a dotenv file. A missing file is `None`.
fn read_env_file(path: &Path) -> Result<Option<String>, ConfigError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(ConfigError::EnvFile(path.to_path_buf(), e)),
    };
    for entry in entries {
        let (key, value) = entry.map_err(|e| ConfigError::EnvFile(path.to_path_buf(), e))?;
        if key == MAP_KEY_ENV {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn read_config_json(path: &Path) -> Result<Option<String>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::ConfigFileRead(path.to_path_buf(), e)),
    };
    let config: ConfigFile = serde_json::from_str(&text)
        .map_err(|e| ConfigError::ConfigFileParse(path.to_path_buf(), e))?;
    Ok(config.map_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_are_parsed_and_ordered() {
        let today = date(2024, 6, 1);
        let range = validate_dates("2023-08-01", "2023-08-31", today).unwrap();
        assert_eq!(range.span_days(), 31);
        assert!(validate_dates("2023-08-01", "2023-08-01", today).is_ok());
        assert!(matches!(
            validate_dates("2023-08-31", "2023-08-01", today),
            Err(ConfigError::StartAfterEnd { .. })
        ));
        assert!(matches!(
            validate_dates("2023/08/01", "2023-08-31", today),
            Err(ConfigError::InvalidDate { .. })
        ));
        assert!(matches!(
            validate_dates("2023-02-30", "2023-03-01", today),
            Err(ConfigError::InvalidDate { .. })
        ));
    }

    #[test]
    fn environment_value_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "FIRMS_MAP_KEY=from_file\n").unwrap();
        let key = resolve_map_key_in(Some("from_env".into()), dir.path()).unwrap();
        assert_eq!(key, "from_env");
    }

    #[test]
    fn env_file_then_config_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"MAP_KEY": "from_json"}"#).unwrap();
        assert_eq!(resolve_map_key_in(None, dir.path()).unwrap(), "from_json");

        std::fs::write(
            dir.path().join(".env"),
            "# credentials\nOTHER=1\nexport FIRMS_MAP_KEY=\"from_dotenv\"\n",
        )
        .unwrap();
        assert_eq!(resolve_map_key_in(Some("  ".into()), dir.path()).unwrap(), "from_dotenv");
    }

    #[test]
    fn env_file_follows_dotenv_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "FIRMS_MAP_KEY=abc123 # personal key\n").unwrap();
        assert_eq!(resolve_map_key_in(None, dir.path()).unwrap(), "abc123");

        std::fs::write(dir.path().join(".env"), "FIRMS_MAP_KEY='quoted # kept'\n").unwrap();
        assert_eq!(resolve_map_key_in(None, dir.path()).unwrap(), "quoted # kept");
    }

    #[test]
    fn invalid_config_json_is_reported_then_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_config_json(&path),
            Err(ConfigError::ConfigFileParse(..))
        ));
        assert!(read_env_file(&dir.path().join(".env")).unwrap().is_none());
    }

    #[test]
    fn missing_key_explains_remediation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        let err = resolve_map_key_in(None, dir.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(".env"));
        assert!(message.contains("config.json"));
        assert!(message.contains(MAP_KEY_SIGNUP_URL));
    }

    #[test]
    fn cli_defaults_become_run_config() {
        let cli = Cli::parse_from(["fire-timelapse", "area.geojson", "2023-08-01", "2023-08-31"]);
        let config = RunConfig::from_cli(cli).unwrap();
        assert_eq!(config.fps, 3);
        assert_eq!(config.dpi, 80);
        assert_eq!(config.basemap, BasemapStyle::Satellite);
        assert_eq!(config.interval, FrameInterval::Monthly);
        assert_eq!(config.colormap, Colormap::Gnuplot2);
        assert_eq!(config.weight_by, WeightBy::Count);
        assert_eq!(config.output_dir, PathBuf::from("outputs/videos"));
        assert!(!config.use_cache);

        let cli = Cli::parse_from([
            "fire-timelapse",
            "area.geojson",
            "2023-08-01",
            "2023-08-31",
            "-o",
            "videos/custom.mp4",
            "--basemap",
            "none",
            "--interval",
            "daily",
            "--cache",
        ]);
        let config = RunConfig::from_cli(cli).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("videos"));
        assert_eq!(config.basemap, BasemapStyle::None);
        assert_eq!(config.interval, FrameInterval::Daily);
        assert!(config.use_cache);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let parsed = Cli::try_parse_from([
            "fire-timelapse",
            "area.geojson",
            "2023-08-01",
            "2023-08-31",
            "--fps",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn enum_options_ignore_case_and_reject_unknown_names() {
        let cli = Cli::parse_from([
            "fire-timelapse",
            "area.geojson",
            "2023-08-01",
            "2023-08-31",
            "--weight-by",
            "FRP",
            "--colormap",
            "Fire",
            "--basemap",
            "OSM",
        ]);
        assert_eq!(cli.weight_by, WeightBy::Frp);
        assert_eq!(cli.colormap, Colormap::Fire);
        assert_eq!(cli.basemap, BasemapStyle::Osm);

        let parsed = Cli::try_parse_from([
            "fire-timelapse",
            "area.geojson",
            "2023-08-01",
            "2023-08-31",
            "--interval",
            "weekly",
        ]);
        assert!(parsed.is_err());
    }
}
