//! Tokio-backed time handler
//!
//! Uses `tokio::time` for both sleeping and the monotonic clock, so a paused
//! test runtime (`start_paused = true`) drives every timer in the core.

use async_trait::async_trait;
use roster_core::effects::PhysicalTimeEffects;
use std::time::Duration;
use tokio::time::Instant;

/// Production time handler.
#[derive(Debug, Clone)]
pub struct TokioTimeHandler {
    origin: Instant,
}

impl TokioTimeHandler {
    /// Create a handler whose monotonic clock starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioTimeHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhysicalTimeEffects for TokioTimeHandler {
    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_paused_runtime() {
        let time = TokioTimeHandler::new();
        assert_eq!(time.monotonic_ms(), 0);

        time.sleep_ms(1_500).await;
        assert_eq!(time.monotonic_ms(), 1_500);

        time.sleep(Duration::from_secs(3)).await;
        assert_eq!(time.monotonic_ms(), 4_500);
    }
}
