//! Muxes rendered frames into an H.264 MP4 with `ffmpeg`.

use chrono::NaiveDate;
use log::{info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_FPS: u32 = 3;

/// Extra copies of the last frame so the video does not end abruptly.
pub const HOLD_LAST_FRAME: u32 = 3;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("No frames to encode")]
    NoFrames,

    #[error("Frame rate must be positive")]
    InvalidFps,

    #[error("Video encoder '{0}' not found; install ffmpeg and make sure it is on PATH")]
    EncoderNotFound(PathBuf),

    #[error("Video encoder exited with {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] io::Error),

    #[error("Failed to write frame list")]
    FrameList(#[source] io::Error),

    #[error("Failed to run video encoder")]
    Spawn(#[source] io::Error),
}

/// `OUTPUT_{start}_{end}_{aoi}.mp4`
pub fn output_file_name(start: NaiveDate, end: NaiveDate, aoi_name: &str) -> String {
    format!(
        "OUTPUT_{}_{}_{}.mp4",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        aoi_name
    )
}

#[derive(Debug, Clone)]
pub struct VideoAssembler {
    ffmpeg: PathBuf,
    fps: u32,
    hold_last_frame: u32,
}

impl Default for VideoAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl VideoAssembler {
    pub fn new(fps: u32) -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            fps,
            hold_last_frame: HOLD_LAST_FRAME,
        }
    }

    pub fn with_encoder(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn with_hold_last_frame(mut self, frames: u32) -> Self {
        self.hold_last_frame = frames;
        self
    }

    /// Playing time of `frame_count` frames plus the held last frame.
    pub fn duration_secs(&self, frame_count: usize) -> f64 {
        (frame_count + self.hold_last_frame as usize) as f64 / self.fps.max(1) as f64
    }

    /// Concat-demuxer script: every frame shown for `1 / fps` seconds, the
    /// last one `hold_last_frame` more times. The final entry is repeated
    /// without a duration, which the demuxer needs to honour the last one.
    pub fn concat_list(&self, frames: &[PathBuf]) -> String {
        let frame_secs = 1.0 / self.fps.max(1) as f64;
        let mut list = String::from("ffconcat version 1.0\n");
        let held = frames
            .last()
            .into_iter()
            .cycle()
            .take(self.hold_last_frame as usize);
        for frame in frames.iter().chain(held) {
            list.push_str(&format!("file '{}'\nduration {:.6}\n", quote(frame), frame_secs));
        }
        if let Some(last) = frames.last() {
            list.push_str(&format!("file '{}'\n", quote(last)));
        }
        list
    }

    /// Encodes `frames` (in order) into `output`, creating its directory.
    pub async fn assemble(&self, frames: &[PathBuf], output: &Path) -> Result<(), VideoError> {
        if frames.is_empty() {
            return Err(VideoError::NoFrames);
        }
        if self.fps == 0 {
            return Err(VideoError::InvalidFps);
        }
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| VideoError::OutputDirCreation(dir.to_path_buf(), e))?;
        }

        info!("Compiling video: {}", output.display());
        info!("Total frames: {}, FPS: {}", frames.len(), self.fps);

        let absolute: Vec<PathBuf> = frames
            .iter()
            .map(|f| std::path::absolute(f).unwrap_or_else(|_| f.clone()))
            .collect();
        let mut list_file = tempfile::Builder::new()
            .prefix("frames_")
            .suffix(".txt")
            .tempfile()
            .map_err(VideoError::FrameList)?;
        list_file
            .write_all(self.concat_list(&absolute).as_bytes())
            .map_err(VideoError::FrameList)?;
        list_file.flush().map_err(VideoError::FrameList)?;

        let fps = self.fps.to_string();
        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .args(["-loglevel", "error"])
            .args(["-f", "concat", "-safe", "0"])
            .arg("-i")
            .arg(list_file.path())
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-r", &fps])
            .arg(output)
            .output()
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VideoError::EncoderNotFound(self.ffmpeg.clone()))
            }
            Err(e) => return Err(VideoError::Spawn(e)),
        };
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(VideoError::EncoderFailed {
                status: result.status.to_string(),
                stderr: tail.join("\n"),
            });
        }

        let total = frames.len() + self.hold_last_frame as usize;
        info!("Video saved: {}", output.display());
        info!(
            "Video duration: {:.1} seconds ({} frames)",
            self.duration_secs(frames.len()),
            total
        );
        Ok(())
    }
}

fn quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Deletes the rendered PNGs and then the directory if it is empty.
pub async fn cleanup_frames(dir: &Path, frames: &[PathBuf]) -> io::Result<()> {
    info!("Cleaning up temporary frames...");
    for frame in frames {
        match tokio::fs::remove_file(frame).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    if let Err(e) = tokio::fs::remove_dir(dir).await {
        warn!("Leaving frame directory {}: {}", dir.display(), e);
    }
    Ok(())
}
