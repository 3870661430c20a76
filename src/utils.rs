use crate::fire_data::error::FireDataError;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use std::io;
use std::path::Path;

pub const DEFAULT_CACHE_DIR: &str = ".cache";

pub async fn ensure_cache_dir_exists(path: &Path) -> Result<(), FireDataError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(FireDataError::CacheDirNotADirectory(path.to_path_buf()));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| FireDataError::CacheDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(FireDataError::CacheDirCreation(path.to_path_buf(), e)),
    }
}

/// Replaces every occurrence of the map key in `text` so URLs can be logged.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***")
}

/// A bar on stderr counting `unit`s, or a hidden one when `visible` is false.
/// indicatif hides it by itself when stderr is not a terminal.
pub fn progress_bar(len: u64, unit: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(&format!(
            "{{bar:40.cyan/blue}} {{pos}}/{{len}} {unit} ({{eta}}) {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_draw_target(ProgressDrawTarget::stderr());
    bar
}
