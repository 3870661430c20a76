use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default minimum spacing between two FIRMS requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(300);

/// Enforces a minimum delay between consecutive network calls.
///
/// One limiter is shared by every chunk of a run (it lives in the request
/// executor), so the spacing holds across chunk boundaries, not just between
/// the retries of one chunk. Time comes from `tokio::time`, which tests pause
/// and advance deterministically.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Sleeps until at least `min_interval` has passed since the previous call
    /// was registered, then registers a new call at the current instant.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
