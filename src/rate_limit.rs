//! Fixed-delay pacing for outbound requests.
//!
//! Every request is preceded by the same pause. Workers sleep independently,
//! so under concurrency the spacing between requests is approximate.

use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    delay: Duration,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Suspend the calling task for the configured pause.
    pub async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        trace!(delay_ms = self.delay.as_millis() as u64, "pacing pause");
        tokio::time::sleep(self.delay).await;
    }
}
