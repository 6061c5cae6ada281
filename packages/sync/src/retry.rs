//! Jittered, capped exponential backoff for read-modify-write loops

use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, warn};

use crate::config::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: Duration::from_millis(config.backoff_base_ms),
            cap: Duration::from_millis(config.backoff_cap_ms),
        }
    }

    /// Upper bound of the delay after the given failed attempt (0-based)
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Random delay in `[ceiling / 2, ceiling]`
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        let millis = rand::thread_rng().gen_range(ceiling / 2..=ceiling);
        Duration::from_millis(millis)
    }

    /// Log the failed attempt and sleep before the next one.
    ///
    /// Returns `false` once attempts are exhausted.
    pub async fn retry(&self, attempt: u32, what: &'static str) -> bool {
        let next = attempt + 1;
        if next >= self.max_attempts {
            error!(attempt = next, what, "Giving up after repeated write conflicts");
            return false;
        }

        let delay = self.delay(attempt);
        if next * 2 >= self.max_attempts {
            warn!(attempt = next, what, delay_ms = delay.as_millis() as u64, "Write conflict, retrying");
        } else {
            debug!(attempt = next, what, delay_ms = delay.as_millis() as u64, "Write conflict, retrying");
        }
        tokio::time::sleep(delay).await;
        true
    }
}
