/// Retry policy for rate-limited upstream calls
use crate::metrics;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Failures that can tell whether they are a transient rate-limit signal
pub trait RateLimitSignal {
    fn is_rate_limited(&self) -> bool;
}

/// Rate-limit heuristic over free-text upstream messages
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("too many requests") || lower.contains("429") || lower.contains("rate limit")
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = just try once)
    pub max_retries: u32,

    /// Delay after the first failed attempt, doubled after each further failure
    pub base_delay: Duration,

    /// Upper bound of the uniform random jitter added to every delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(300),
            max_jitter: Duration::from_millis(150),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_jitter,
        }
    }

    /// Deterministic part of the delay after failed attempt `attempt` (0-indexed)
    pub fn backoff_floor(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.backoff_floor(attempt) + jitter
    }

    /// Executes an operation, retrying only rate-limited failures
    ///
    /// Any other failure is returned immediately. When retries run out the
    /// last rate-limit failure itself is returned.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal + Display,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::info!("Upstream call succeeded after {} attempt(s)", attempt + 1);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !err.is_rate_limited() {
                        return Err(err);
                    }

                    if attempt >= self.max_retries {
                        tracing::error!(
                            "Upstream still rate limited after {} attempts: {}",
                            attempt + 1,
                            err
                        );
                        return Err(err);
                    }

                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Upstream rate limited (attempt {}/{}): {}. Retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        err,
                        delay
                    );
                    metrics::record_resolve_retry();

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
