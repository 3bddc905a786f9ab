use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Bounded retry with exponential backoff. `max_retries == 0` means one attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `operation` until it succeeds or the retries are spent; the last error wins.
    pub async fn run<F, Fut, T, E>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        what,
                        attempt = attempt + 1,
                        total = self.max_retries + 1,
                        ?delay,
                        "{}, retrying",
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
