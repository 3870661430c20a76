//! Entry point of the pipeline: fetch the detections of an area of interest,
//! clip them to the polygon, render one frame per period and compile the
//! frames into a video.

use crate::config::RunConfig;
use crate::error::TimelapseError;
use crate::fire_data::cache_store::CacheStore;
use crate::fire_data::executor::{FirmsEndpoint, RequestExecutor};
use crate::fire_data::orchestrator::FetchOrchestrator;
use crate::fire_data::transport::{FirmsTransport, HttpTransport};
use crate::render::basemap::Basemap;
use crate::render::error::RenderError;
use crate::render::frames::{FrameRenderer, RenderedFrame};
use crate::render::viewport::Projection;
use crate::spatial::aoi::Aoi;
use crate::spatial::clip::clip_to_aoi;
use crate::types::chunk_result::RunSummary;
use crate::utils::ensure_cache_dir_exists;
use crate::video::{cleanup_frames, output_file_name, VideoAssembler};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Frames on disk plus what was learned while producing them.
#[derive(Debug, Clone)]
pub struct RenderedRun {
    pub aoi_name: String,
    pub frames: Vec<RenderedFrame>,
    pub summary: RunSummary,
    /// Detections inside the request box.
    pub detections: usize,
    /// Detections inside the AOI polygon.
    pub detections_in_aoi: usize,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct TimelapseReport {
    pub video: PathBuf,
    pub run: RenderedRun,
}

/// Runs the four pipeline stages for one [`RunConfig`].
///
/// # Examples
///
/// ```no_run
/// # use fire_timelapse::{Cli, FireTimelapse, RunConfig, TimelapseError};
/// # use clap::Parser;
/// # async fn run() -> Result<(), TimelapseError> {
/// let cli = Cli::parse_from(["fire-timelapse", "area.geojson", "2023-08-01", "2023-09-30"]);
/// let config = RunConfig::from_cli(cli)?;
/// let report = FireTimelapse::new(config, "MY_MAP_KEY").run().await?;
/// println!("{}", report.video.display());
/// # Ok(())
/// # }
/// ```
pub struct FireTimelapse {
    config: RunConfig,
    map_key: String,
    show_progress: bool,
}

impl FireTimelapse {
    pub fn new(config: RunConfig, map_key: impl Into<String>) -> Self {
        Self {
            config,
            map_key: map_key.into(),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetches over HTTPS, renders, compiles the video and removes the frames
    /// unless they are to be kept.
    pub async fn run(&self) -> Result<TimelapseReport, TimelapseError> {
        let total = Instant::now();
        let transport = HttpTransport::new()?;
        let run = self.render_with(transport).await?;

        info!("[4/4] Compiling video...");
        let started = Instant::now();
        let range = self.config.range;
        let video = self.config.output_dir.join(output_file_name(
            range.start(),
            range.end(),
            &run.aoi_name,
        ));
        let frame_paths: Vec<PathBuf> = run.frames.iter().map(|f| f.path.clone()).collect();
        VideoAssembler::new(self.config.fps)
            .assemble(&frame_paths, &video)
            .await?;
        info!("Video compiled in {:.1}s", started.elapsed().as_secs_f64());

        if self.config.keep_frames {
            info!("Frames kept in {}", self.config.frames_dir.display());
        } else if let Err(e) = cleanup_frames(&self.config.frames_dir, &frame_paths).await {
            warn!("Could not remove frames: {}", e);
        }

        info!("Total time: {:.1}s", total.elapsed().as_secs_f64());
        info!("Output: {}", video.display());
        Ok(TimelapseReport { video, run })
    }

    /// Stages one to three over `transport`: fetch, clip and render.
    pub async fn render_with<T: FirmsTransport>(
        &self,
        transport: T,
    ) -> Result<RenderedRun, TimelapseError> {
        let config = &self.config;
        let aoi = Aoi::load(&config.aoi_file).await?;
        let bbox = aoi.request_bbox(config.buffer_km);
        info!("AOI '{}', request bbox {}", aoi.name(), bbox);

        info!("[1/4] Fetching fire data...");
        let started = Instant::now();
        let cache = if config.use_cache {
            ensure_cache_dir_exists(&config.cache_dir).await?;
            Some(CacheStore::new(&config.cache_dir))
        } else {
            None
        };
        let endpoint = FirmsEndpoint::new(config.api_url.clone(), config.source.clone());
        let executor = RequestExecutor::new(transport, endpoint, cache);
        let mut orchestrator = FetchOrchestrator::new(executor).with_progress(self.show_progress);
        let outcome = orchestrator
            .fetch()
            .map_key(&self.map_key)
            .bbox(&bbox)
            .range(config.range)
            .use_cache(config.use_cache)
            .call()
            .await?;
        info!(
            "Fetched {} detections in {:.1}s",
            outcome.table.height(),
            started.elapsed().as_secs_f64()
        );

        info!("[2/4] Clipping to AOI...");
        let started = Instant::now();
        let clipped = clip_to_aoi(&outcome.table, &aoi)?;
        let all = clipped.all.points()?;
        let within_aoi = clipped.within_aoi.points()?;
        info!("Clipped in {:.1}s", started.elapsed().as_secs_f64());

        info!("[3/4] Rendering frames...");
        let started = Instant::now();
        let projection = if config.basemap.is_enabled() {
            Projection::WebMercator
        } else {
            Projection::LonLat
        };
        let aoi_name = aoi.name().to_string();
        let renderer = FrameRenderer::builder()
            .aoi(aoi)
            .output_dir(config.frames_dir.clone())
            .projection(projection)
            .buffer_km(config.buffer_km)
            .interval(config.interval)
            .weight_by(config.weight_by)
            .colormap(config.colormap)
            .dpi(config.dpi)
            .show_progress(self.show_progress)
            .build();

        let map = renderer.layout().map;
        let fetched =
            Basemap::fetch(config.basemap, renderer.map_viewport(), map.width, map.height).await;
        let basemap = match fetched {
            Ok(basemap) => basemap,
            Err(e) => {
                warn!("Basemap unavailable, continuing without it: {}", e);
                None
            }
        };
        let renderer = renderer.with_basemap(basemap);

        let range = config.range;
        let (frames, all, within_aoi) = tokio::task::spawn_blocking(move || {
            let frames = renderer.render_all(&all, &within_aoi, range);
            (frames, all.len(), within_aoi.len())
        })
        .await
        .map_err(RenderError::TaskJoin)?;
        let frames = frames?;
        info!(
            "Rendered {} frames in {:.1}s",
            frames.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(RenderedRun {
            aoi_name,
            frames,
            summary: outcome.summary,
            detections: all,
            detections_in_aoi: within_aoi,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fire_data::executor::tests::{server_error, ScriptedTransport};
    use crate::fire_data::fire_table::tests::{csv, ROW_A, ROW_B};
    use crate::render::basemap::BasemapStyle;
    use crate::render::colormap::Colormap;
    use crate::spatial::aoi::tests::SQUARE;
    use crate::types::date_range::DateRange;
    use crate::types::frame_interval::{FrameInterval, WeightBy};
    use chrono::NaiveDate;
    use std::path::Path;

    /// Row outside the AOI square but inside the buffered request box.
    const ROW_OUTSIDE: &str =
        "37.5,-120.9,315.0,1.0,1.0,2023-09-03,1200,A,MODIS,70,6.03,289.0,9.0,N,0";

    fn config(root: &Path) -> RunConfig {
        let aoi_file = root.join("square.geojson");
        std::fs::write(&aoi_file, SQUARE).unwrap();
        RunConfig {
            aoi_file,
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
            )
            .unwrap(),
            output_dir: root.join("videos"),
            fps: 3,
            use_cache: false,
            keep_frames: false,
            basemap: BasemapStyle::None,
            interval: FrameInterval::Monthly,
            dpi: 25,
            weight_by: WeightBy::Count,
            colormap: Colormap::Gnuplot2,
            source: "MODIS_SP".to_string(),
            buffer_km: 25.0,
            cache_dir: root.join("cache"),
            frames_dir: root.join("frames"),
            api_url: "https://firms.test/api/area/csv".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn renders_one_frame_per_month() {
        let root = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::default();
        transport.script_url("/2023-08-01", [Ok(csv(&[ROW_A, ROW_B]))]);
        transport.script_url("/2023-08-31", [Ok(csv(&[ROW_OUTSIDE]))]);
        let pipeline = FireTimelapse::new(config(root.path()), "KEY").with_progress(false);

        // Every other chunk falls back to the default queue, which is empty.
        let run = pipeline.render_with(transport).await.unwrap();

        assert_eq!(run.aoi_name, "square");
        assert_eq!(run.summary.chunks, 7);
        assert_eq!(run.summary.failures.len(), 5);
        assert_eq!(run.detections, 3);
        assert_eq!(run.detections_in_aoi, 2);
        let labels: Vec<&str> = run.frames.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["2023-08", "2023-09"]);
        assert_eq!(run.frames[0].detections, 2);
        assert_eq!(run.frames[1].detections, 0);
        assert!(run.frames.iter().all(|f| f.path.exists()));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_directory_is_created_when_caching() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config(root.path());
        config.use_cache = true;
        config.interval = FrameInterval::Daily;
        config.range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 8, 2).unwrap(),
        )
        .unwrap();
        let transport = ScriptedTransport::with_responses([server_error(), Ok(csv(&[ROW_A]))]);

        let run = FireTimelapse::new(config, "KEY")
            .with_progress(false)
            .render_with(transport)
            .await
            .unwrap();

        assert!(root.path().join("cache").is_dir());
        assert_eq!(std::fs::read_dir(root.path().join("cache")).unwrap().count(), 1);
        assert_eq!(run.frames.len(), 2);
        assert_eq!(run.summary.requests, 2);
        assert!(!run.summary.has_failures());
    }
}
