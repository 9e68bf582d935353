use governor::{Quota, RateLimiter as GovernorRateLimiter};
use rand::{thread_rng, Rng};
use std::fmt::Display;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_backoff: Duration::from_secs(32),
        }
    }

    /// No waiting between attempts. Used by tests and local mocks.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_backoff)
    }

    fn jittered(&self, retry: u32) -> Duration {
        let delay = self.backoff_for(retry);
        let jitter_ceiling = (self.base_delay.as_millis() / 2) as u64;
        if jitter_ceiling == 0 {
            return delay;
        }
        delay + Duration::from_millis(thread_rng().gen_range(0..jitter_ceiling))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Duration::from_secs(1))
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<
        GovernorRateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    policy: RetryPolicy,
    request_count: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(requests_per_second: NonZeroU32, policy: RetryPolicy) -> Self {
        let quota = Quota::per_second(requests_per_second);
        let limiter = Arc::new(GovernorRateLimiter::direct(quota));

        debug!(
            "Creating rate limiter with limit of {} requests per second, {} retries",
            requests_per_second, policy.max_retries
        );
        Self {
            limiter,
            policy,
            request_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total number of attempts let through so far, retries included.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    async fn check_rate_limit(&self) {
        self.limiter.until_ready().await;
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Run `operation` until it succeeds, `is_retryable` rejects the error, or
    /// the retry budget is spent. The last error is returned on failure.
    pub async fn execute_with_retry_if<T, E, F, Fut, P>(
        &self,
        operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        E: Display,
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut retries = 0;

        loop {
            self.check_rate_limit().await;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if retries >= self.policy.max_retries || !is_retryable(&e) {
                        return Err(e);
                    }

                    retries += 1;
                    let wait_time = self.policy.jittered(retries);

                    warn!(
                        "Request failed ({}), retry {} of {}, waiting {:?}",
                        e, retries, self.policy.max_retries, wait_time
                    );

                    if !wait_time.is_zero() {
                        sleep(wait_time).await;
                    }
                }
            }
        }
    }
}
