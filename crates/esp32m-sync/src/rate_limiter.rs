//! Minimum spacing between invocations.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Serializes calls and starts each one at least `interval` after the
/// previous one finished.
///
/// Callers that arrive early wait their turn; calls are never dropped.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    /// When the last call finished.
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a call would be allowed and claim the slot.
    pub async fn wait(&self) {
        self.invoke(|| async {}).await
    }

    /// Run `f` once the rate limit allows it.
    pub async fn invoke<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.interval;
            if next > Instant::now() {
                sleep_until(next).await;
            }
        }
        let result = f().await;
        *last = Some(Instant::now());
        result
    }
}
