//! On-disk cache of FIRMS responses, one file per request identity.
//!
//! Historical detections for a past date never change, so entries are never
//! invalidated; the operator controls their lifetime by toggling caching or
//! deleting the directory.

use crate::fire_data::error::FireDataError;
use crate::fire_data::fire_table::FireTable;
use crate::types::chunk_result::ChunkResult;
use crate::utils::ensure_cache_dir_exists;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

/// The provider's literal "zero detections" response, also used as the
/// on-disk marker for empty chunks.
pub const NO_DATA_SENTINEL: &str = "No data";

/// True if `body` is the no-data sentinel, ignoring case and surrounding whitespace.
pub fn is_no_data(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case(NO_DATA_SENTINEL)
}

/// Stable fingerprint of a fully resolved request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes the request URL, which carries endpoint, map key, source,
    /// bounding box, day span and start date.
    pub fn from_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        CacheKey(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What gets persisted for a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The verbatim CSV body.
    Rows(String),
    /// The provider said there is no data.
    Empty,
}

impl CacheEntry {
    fn contents(&self) -> &str {
        match self {
            CacheEntry::Rows(csv) => csv,
            CacheEntry::Empty => NO_DATA_SENTINEL,
        }
    }
}

/// Sole reader and writer of the cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// The directory is created on the first [`CacheStore::store`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.csv"))
    }

    /// Returns the cached outcome for `key`, either `Rows` or `Empty`.
    ///
    /// Missing, unreadable or corrupt entries all come back as `None`, so the
    /// caller falls through to a live fetch.
    pub async fn lookup(&self, key: &CacheKey) -> Option<ChunkResult> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Ignoring unreadable cache file {:?}: {}", path, e);
                return None;
            }
        };

        if is_no_data(&text) {
            debug!("Cache hit (no data) at {:?}", path);
            return Some(ChunkResult::Empty);
        }

        match FireTable::from_csv(&text) {
            Ok(table) if !table.is_empty() => {
                debug!("Cache hit ({} rows) at {:?}", table.height(), path);
                Some(ChunkResult::Rows(table))
            }
            Ok(_) => {
                warn!("Ignoring cache file without rows {:?}", path);
                None
            }
            Err(e) => {
                warn!("Ignoring corrupt cache file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Persists `entry` under `key`. The file appears complete or not at all:
    /// content goes to a temporary file in the cache directory that is then
    /// renamed over the final name.
    pub async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), FireDataError> {
        ensure_cache_dir_exists(&self.dir).await?;

        let dir = self.dir.clone();
        let path = self.path_for(key);
        let contents = entry.contents().as_bytes().to_vec();

        task::spawn_blocking(move || {
            let write = || -> io::Result<()> {
                let mut temp_file = NamedTempFile::new_in(&dir)?;
                temp_file.write_all(&contents)?;
                temp_file.as_file().sync_all()?;
                temp_file.persist(&path).map_err(|e| e.error)?;
                Ok(())
            };
            write().map_err(|e| FireDataError::CacheWrite(path.clone(), e))
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fire_data::fire_table::tests::{csv, ROW_A, ROW_B};

    #[test]
    fn sentinel_matching_ignores_case_and_whitespace() {
        assert!(is_no_data("No data"));
        assert!(is_no_data("  no DATA\n"));
        assert!(!is_no_data("No data available"));
        assert!(!is_no_data(""));
    }

    #[test]
    fn keys_are_deterministic_per_request() {
        let a = CacheKey::from_url("https://x/api/area/csv/k/MODIS_SP/1,2,3,4/10/2023-08-01");
        let b = CacheKey::from_url("https://x/api/area/csv/k/MODIS_SP/1,2,3,4/10/2023-08-01");
        let c = CacheKey::from_url("https://x/api/area/csv/k/MODIS_SP/1,2,3,4/10/2023-08-11");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[tokio::test]
    async fn stored_rows_come_back() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path().join("cache"));
        let key = CacheKey::from_url("rows");
        let body = csv(&[ROW_A, ROW_B]);

        assert!(store.lookup(&key).await.is_none());
        store.store(&key, &CacheEntry::Rows(body.clone())).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.path_for(&key)).unwrap(), body);
        match store.lookup(&key).await {
            Some(ChunkResult::Rows(table)) => {
                let expected = FireTable::from_csv(&body).unwrap();
                assert!(table.frame.equals(&expected.frame));
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stored_empty_comes_back_as_empty() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path());
        let key = CacheKey::from_url("empty");
        store.store(&key, &CacheEntry::Empty).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(store.path_for(&key)).unwrap(),
            NO_DATA_SENTINEL
        );
        assert!(matches!(store.lookup(&key).await, Some(ChunkResult::Empty)));
    }

    #[tokio::test]
    async fn storing_twice_is_harmless() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path());
        let key = CacheKey::from_url("twice");
        let entry = CacheEntry::Rows(csv(&[ROW_A]));
        store.store(&key, &entry).await.unwrap();
        store.store(&key, &entry).await.unwrap();
        assert!(matches!(store.lookup(&key).await, Some(ChunkResult::Rows(_))));
        let files = std::fs::read_dir(root.path()).unwrap().count();
        assert_eq!(files, 1, "temporary files must not be left behind");
    }

    #[tokio::test]
    async fn corrupt_entries_are_misses() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path());
        let key = CacheKey::from_url("corrupt");
        std::fs::write(store.path_for(&key), "<html>truncated").unwrap();
        assert!(store.lookup(&key).await.is_none());

        std::fs::write(store.path_for(&key), [0xff, 0xfe, 0x00]).unwrap();
        assert!(store.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn directory_is_not_created_by_lookup() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("lazy");
        let store = CacheStore::new(&dir);
        assert!(store.lookup(&CacheKey::from_url("x")).await.is_none());
        assert!(!dir.exists());
    }
}
