//! Turns one chunk into a [`ChunkResult`]: cache first, then paced network
//! attempts with backoff that depends on why the previous attempt failed.

use crate::fire_data::cache_store::{is_no_data, CacheEntry, CacheKey, CacheStore};
use crate::fire_data::fire_table::FireTable;
use crate::fire_data::rate_limiter::RateLimiter;
use crate::fire_data::transport::{FirmsTransport, TransportError};
use crate::types::bbox::BoundingBox;
use crate::types::chunk_result::{ChunkOutcome, ChunkResult};
use crate::types::date_range::Chunk;
use crate::utils::redact;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::sleep;

pub const FIRMS_AREA_API: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv";
pub const DEFAULT_SOURCE: &str = "MODIS_SP";

/// Where area requests go: API base URL and data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmsEndpoint {
    pub base_url: String,
    pub source: String,
}

impl Default for FirmsEndpoint {
    fn default() -> Self {
        Self {
            base_url: FIRMS_AREA_API.to_string(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl FirmsEndpoint {
    pub fn new(base_url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            source: source.into(),
        }
    }

    /// `{base}/{map_key}/{source}/{west,south,east,north}/{day_range}/{YYYY-MM-DD}`
    pub fn request_url(&self, map_key: &str, bbox: &BoundingBox, chunk: &Chunk) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            map_key,
            self.source,
            bbox,
            chunk.span_days,
            chunk.start().format("%Y-%m-%d")
        )
    }
}

/// Attempt budget and delays of the request executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Attempt `n > 1` waits `n * retry_step` before its request.
    pub retry_step: Duration,
    /// First backoff after a rate-limit failure, doubled per attempt.
    pub rate_limit_backoff: Duration,
    /// First backoff after any other failure, doubled per attempt.
    pub generic_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_step: Duration::from_secs(1),
            rate_limit_backoff: Duration::from_secs(5),
            generic_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Fixed pre-request delay of the (1-based) `attempt`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.retry_step * attempt
        }
    }

    /// Backoff after the (1-based) `attempt` failed with `error`.
    pub fn backoff(&self, attempt: u32, error: &TransportError) -> Duration {
        let base = if error.is_rate_limited() {
            self.rate_limit_backoff
        } else {
            self.generic_backoff
        };
        base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

enum ParsedBody {
    NoData,
    Table { table: FireTable, body: String },
}

fn parse_body(body: String) -> Result<ParsedBody, TransportError> {
    if is_no_data(&body) {
        return Ok(ParsedBody::NoData);
    }
    match FireTable::from_csv(&body) {
        Ok(table) => Ok(ParsedBody::Table { table, body }),
        Err(e) => Err(TransportError::InvalidBody(e.to_string())),
    }
}

/// Fetches single chunks. Owns the run-wide [`RateLimiter`].
pub struct RequestExecutor<T> {
    transport: T,
    endpoint: FirmsEndpoint,
    cache: Option<CacheStore>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl<T: FirmsTransport> RequestExecutor<T> {
    pub fn new(transport: T, endpoint: FirmsEndpoint, cache: Option<CacheStore>) -> Self {
        Self {
            transport,
            endpoint,
            cache,
            rate_limiter: RateLimiter::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoint(&self) -> &FirmsEndpoint {
        &self.endpoint
    }

    /// Produces the terminal outcome of `chunk`. Never fails: exhausted retries
    /// come back as [`ChunkResult::Error`].
    pub async fn execute(
        &mut self,
        chunk: &Chunk,
        map_key: &str,
        bbox: &BoundingBox,
        use_cache: bool,
    ) -> ChunkOutcome {
        let url = self.endpoint.request_url(map_key, bbox, chunk);
        let key = CacheKey::from_url(&url);
        let cache = if use_cache { self.cache.as_ref() } else { None };

        if let Some(store) = cache {
            if let Some(result) = store.lookup(&key).await {
                debug!("Chunk {} served from cache", chunk);
                return ChunkOutcome {
                    result,
                    from_cache: true,
                    network_attempts: 0,
                };
            }
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            self.rate_limiter.acquire().await;
            let retry_delay = self.retry.retry_delay(attempt);
            if !retry_delay.is_zero() {
                sleep(retry_delay).await;
            }
            debug!(
                "Requesting chunk {} (attempt {}/{}): {}",
                chunk,
                attempt,
                max_attempts,
                redact(&url, map_key)
            );

            match self.transport.get(&url).await.and_then(parse_body) {
                Ok(ParsedBody::NoData) => {
                    if let Some(store) = cache {
                        Self::persist(store, &key, &CacheEntry::Empty).await;
                    }
                    return Self::network_outcome(ChunkResult::Empty, attempt);
                }
                Ok(ParsedBody::Table { table, .. }) if table.is_empty() => {
                    return Self::network_outcome(ChunkResult::Empty, attempt);
                }
                Ok(ParsedBody::Table { table, body }) => {
                    if let Some(store) = cache {
                        Self::persist(store, &key, &CacheEntry::Rows(body)).await;
                    }
                    return Self::network_outcome(ChunkResult::Rows(table), attempt);
                }
                Err(error) => {
                    last_error = redact(&error.to_string(), map_key);
                    if attempt < max_attempts {
                        let backoff = self.retry.backoff(attempt, &error);
                        warn!(
                            "Chunk {} attempt {}/{} failed{}: {}. Retrying in {:?}",
                            chunk,
                            attempt,
                            max_attempts,
                            if error.is_rate_limited() { " (rate limited)" } else { "" },
                            last_error,
                            backoff
                        );
                        sleep(backoff).await;
                    } else {
                        warn!(
                            "Chunk {} attempt {}/{} failed: {}. Giving up",
                            chunk, attempt, max_attempts, last_error
                        );
                    }
                }
            }
        }

        Self::network_outcome(
            ChunkResult::Error {
                attempts: max_attempts,
                message: format!("Failed after {} attempts: {}", max_attempts, last_error),
            },
            max_attempts,
        )
    }

    async fn persist(store: &CacheStore, key: &CacheKey, entry: &CacheEntry) {
        if let Err(e) = store.store(key, entry).await {
            warn!("Failed to cache response {}: {}", key, e);
        }
    }

    fn network_outcome(result: ChunkResult, attempts: u32) -> ChunkOutcome {
        ChunkOutcome {
            result,
            from_cache: false,
            network_attempts: attempts,
        }
    }
}
