//! Drives the planner and the request executor over a whole date range.

use crate::fire_data::error::FireDataError;
use crate::fire_data::executor::RequestExecutor;
use crate::fire_data::fire_table::FireTable;
use crate::fire_data::planner::plan_firms_chunks;
use crate::fire_data::transport::FirmsTransport;
use crate::types::bbox::BoundingBox;
use crate::types::chunk_result::{ChunkFailure, ChunkResult, RunSummary};
use crate::types::date_range::DateRange;
use crate::utils::progress_bar;
use bon::bon;
use log::{info, warn};

/// How many failed chunks are listed individually in the run log.
const LOGGED_FAILURES: usize = 10;

/// The aggregated detections of a fetch plus its statistics.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub table: FireTable,
    pub summary: RunSummary,
}

/// Fetches every chunk of a range one after another and merges the results.
///
/// Chunks are never issued concurrently: parallel requests trip the
/// provider's throttling and lose data silently.
pub struct FetchOrchestrator<T> {
    executor: RequestExecutor<T>,
    show_progress: bool,
}

#[bon]
impl<T: FirmsTransport> FetchOrchestrator<T> {
    pub fn new(executor: RequestExecutor<T>) -> Self {
        Self {
            executor,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    /// Fetches all detections inside `bbox` for `range`.
    ///
    /// Failed chunks do not abort the run; they are listed in
    /// [`RunSummary::failures`]. A range without detections yields an empty
    /// table, not an error.
    ///
    /// # Errors
    ///
    /// Only when merging the collected tables fails.
    #[builder]
    pub async fn fetch(
        &mut self,
        map_key: &str,
        bbox: &BoundingBox,
        range: DateRange,
        #[builder(default)] use_cache: bool,
    ) -> Result<FetchOutcome, FireDataError> {
        let chunks = plan_firms_chunks(range);
        info!(
            "Fetching {} to {} in {} chunks (bbox {})",
            range.start(),
            range.end(),
            chunks.len(),
            bbox
        );

        let progress = progress_bar(chunks.len() as u64, "chunks", self.show_progress);
        let mut summary = RunSummary {
            chunks: chunks.len(),
            ..RunSummary::default()
        };
        let mut tables = Vec::new();

        for chunk in &chunks {
            progress.set_message(chunk.to_string());
            let outcome = self.executor.execute(chunk, map_key, bbox, use_cache).await;

            if outcome.from_cache {
                summary.cache_hits += 1;
            } else {
                summary.api_calls += 1;
            }
            summary.requests += outcome.network_attempts as usize;

            match outcome.result {
                ChunkResult::Rows(table) => tables.push(table),
                ChunkResult::Empty => {}
                ChunkResult::Error { attempts, message } => {
                    summary.failures.push(ChunkFailure {
                        chunk: *chunk,
                        attempts,
                        message,
                    })
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        if use_cache {
            info!(
                "Cache: {} hits, {} API calls",
                summary.cache_hits, summary.api_calls
            );
        }
        log_failures(&summary.failures);

        let table = if tables.is_empty() {
            FireTable::empty()
        } else {
            FireTable::concat_unique(tables)?
        };
        info!("Total detections: {}", table.height());

        Ok(FetchOutcome { table, summary })
    }
}

fn log_failures(failures: &[ChunkFailure]) {
    if failures.is_empty() {
        return;
    }
    warn!("{} chunks failed after all retries:", failures.len());
    for failure in failures.iter().take(LOGGED_FAILURES) {
        warn!("  {}: {}", failure.chunk, failure.message);
    }
    if failures.len() > LOGGED_FAILURES {
        warn!("  ... and {} more", failures.len() - LOGGED_FAILURES);
    }
}
