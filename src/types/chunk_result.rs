//! Outcomes of fetching a single chunk, and the statistics of a whole fetch run.

use crate::fire_data::fire_table::FireTable;
use crate::types::date_range::Chunk;

/// Terminal outcome of one chunk. Failures are values, never panics or `Err`s.
#[derive(Debug, Clone)]
pub enum ChunkResult {
    /// The provider returned at least one detection.
    Rows(FireTable),
    /// The provider confirmed there is no data for this chunk.
    Empty,
    /// Every attempt failed.
    Error {
        attempts: u32,
        message: String,
    },
}

/// A chunk's result plus how it was obtained.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub result: ChunkResult,
    /// Served from the disk cache without touching the network.
    pub from_cache: bool,
    /// Number of network requests issued for this chunk (0 on a cache hit).
    pub network_attempts: u32,
}

/// A chunk whose retries were exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    pub chunk: Chunk,
    pub attempts: u32,
    pub message: String,
}

/// Counters and failures collected over one fetch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub chunks: usize,
    pub cache_hits: usize,
    /// Chunks that went to the network (at least one request).
    pub api_calls: usize,
    /// Individual network requests, retries included.
    pub requests: usize,
    pub failures: Vec<ChunkFailure>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
