use crate::{Result, StoreError};
use tokio::time::{sleep, Duration};

/// Upper bound on a single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// One fresh attempt after a lost conditional write, no backoff.
    pub fn conflict() -> Self {
        Self::new(2, Duration::ZERO)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// declines, or the attempts run out. Delays double after every failure,
/// up to [`MAX_RETRY_DELAY`].
pub async fn with_retry_if<F, Fut, T, P>(config: &RetryConfig, should_retry: P, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    P: Fn(&StoreError) -> bool,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if attempts >= config.max_attempts || !should_retry(&e) {
                    return Err(e);
                }
                if !config.initial_delay.is_zero() {
                    sleep(backoff_delay(config.initial_delay, attempts)).await;
                }
            }
        }
    }
}

fn backoff_delay(initial: Duration, attempts: u32) -> Duration {
    2u32.checked_pow(attempts - 1)
        .and_then(|factor| initial.checked_mul(factor))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}
