//! Time effects for retry backoff, silent refresh and the switch countdown.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Monotonic clock and sleeping.
///
/// Every timer in the core goes through this trait so tests can drive time
/// deterministically.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Milliseconds elapsed on a monotonic clock since the handler was created.
    fn monotonic_ms(&self) -> u64;

    /// Suspend the calling task for `ms` milliseconds.
    async fn sleep_ms(&self, ms: u64);

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.sleep_ms(ms).await;
    }
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for Arc<T> {
    fn monotonic_ms(&self) -> u64 {
        (**self).monotonic_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await;
    }
}
