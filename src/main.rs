//! `fire-timelapse`: renders a fire-activity timelapse video for an area of
//! interest from NASA FIRMS detections.

use anyhow::Context;
use clap::Parser;
use fire_timelapse::{resolve_map_key, Cli, FireTimelapse, RunConfig};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = RunConfig::from_cli(cli)?;
    let map_key = resolve_map_key()?;

    info!(
        "Fire timelapse for {} from {} to {}",
        config.aoi_file.display(),
        config.range.start(),
        config.range.end()
    );
    let report = FireTimelapse::new(config, map_key)
        .run()
        .await
        .context("timelapse run failed")?;

    let summary = &report.run.summary;
    if summary.has_failures() {
        info!(
            "{} of {} chunks failed; the video may be missing detections",
            summary.failures.len(),
            summary.chunks
        );
    }
    println!("{}", report.video.display());
    Ok(())
}
