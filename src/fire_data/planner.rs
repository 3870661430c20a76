//! Splits a requested date range into request-sized chunks.
//!
//! The FIRMS area API accepts at most [`FIRMS_CHUNK_LIMIT_DAYS`] days per
//! request, and very long spans silently lose data, so ranges longer than the
//! batching limit are first cut into year-sized batches and every batch is
//! chunked on its own.

use crate::types::date_range::{Chunk, DateRange};

/// Maximum day range of one FIRMS area request.
pub const FIRMS_CHUNK_LIMIT_DAYS: u32 = 10;

/// Batch size used for long ranges.
pub const YEARLY_BATCH_DAYS: u32 = 365;

/// Plans the chunks for `range` in chronological order.
///
/// With `batch_limit_days = Some(n)` and a range longer than `n` days, the
/// range is cut into consecutive batches of at most `n` days and each batch is
/// chunked independently. Every chunk spans at most `chunk_limit_days` days and
/// the chunks abut exactly: no gaps and no overlap.
pub fn plan(range: DateRange, chunk_limit_days: u32, batch_limit_days: Option<u32>) -> Vec<Chunk> {
    let batches = match batch_limit_days {
        Some(limit) if range.span_days() > limit => range.split(limit),
        _ => vec![range],
    };

    batches
        .into_iter()
        .flat_map(|batch| batch.split(chunk_limit_days))
        .map(Chunk::new)
        .collect()
}

/// Chunk plan used by the fetch orchestrator.
pub fn plan_firms_chunks(range: DateRange) -> Vec<Chunk> {
    plan(range, FIRMS_CHUNK_LIMIT_DAYS, Some(YEARLY_BATCH_DAYS))
}
