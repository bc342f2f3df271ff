//! Exponential retry backoff with jitter.

use std::time::Duration;

use rand::Rng;
use velo_core::config::SchedulerConfig;

/// Retry delay policy: exponential growth from a base delay, capped, with
/// symmetric jitter so synchronized failures do not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    /// ± fraction of the computed delay, clamped to [0, 1].
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.backoff_base_ms),
            factor: config.backoff_factor.max(1.0),
            max_delay: Duration::from_millis(config.backoff_cap_ms),
            jitter: config.backoff_jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before the retry that follows failure number `failures`
    /// (1-based): failure 1 waits `base`, failure 2 waits `base*factor`,
    /// and so on up to `max_delay`.
    pub fn delay_after_failure(&self, failures: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        // Cap the exponent; past 31 doublings the cap has long since won.
        let exponent = failures.saturating_sub(1).min(31) as i32;
        let raw_ms = (base_ms * self.factor.powi(exponent)).min(max_ms);
        let jittered_ms = if self.jitter > 0.0 {
            let spread = raw_ms * self.jitter;
            raw_ms + rand::rng().random_range(-spread..=spread)
        } else {
            raw_ms
        };
        Duration::from_millis(jittered_ms.max(0.0) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}
