//! Back-off for transient WebDriver failures.
//!
//! Session creation and navigation are retried. Element lookups hit the
//! already-loaded page and are not.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Whether `err` may go away on its own: connection trouble, a 5xx with no
/// driver error body, or a driver-side page-load `timeout`.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(e) => e.is_timeout() || e.is_connect(),
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        ScraperError::WebDriver { error, .. } => error == "timeout",
        ScraperError::Deserialize { .. }
        | ScraperError::ElementNotFound { .. }
        | ScraperError::InvalidUrl { .. } => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Extra attempts after the first one.
    pub(crate) max_retries: u32,
    pub(crate) base: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, base_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(base_ms),
        }
    }

    /// Un-jittered wait before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at 30 s.
    fn nominal_delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(10);
        self.base.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Nominal delay scaled by a random factor in `[0.75, 1.25)`.
    fn jittered_delay(&self, retry: u32) -> Duration {
        self.nominal_delay(retry)
            .mul_f64(rand::random_range(0.75..1.25))
    }

    /// Run `attempt` until it succeeds, fails with a non-retriable error, or
    /// the retry budget is spent. The last error is returned.
    pub(crate) async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut retry = 0u32;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !is_retriable(&err) {
                return Err(err);
            }
            retry += 1;
            let delay = self.jittered_delay(retry);
            tracing::warn!(
                retry,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient webdriver failure; backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
