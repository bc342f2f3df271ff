use serde::{Deserialize, Serialize};

use super::defaults;

/// Background-scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker-pool size. Work beyond this queues; nothing spawns unbounded.
    pub concurrency: usize,
    /// First retry delay (milliseconds).
    pub backoff_base_ms: u64,
    /// Multiplier applied to the delay per subsequent retry.
    pub backoff_factor: f64,
    /// Ceiling on any retry delay (milliseconds).
    pub backoff_cap_ms: u64,
    /// Jitter applied to retry delays (± fraction, clamped to [0, 1]).
    pub backoff_jitter: f64,
    /// Attempts permitted per task unless the submission overrides it.
    pub default_max_attempts: u32,
    /// Per-attempt duration ceiling unless overridden (milliseconds).
    pub default_max_duration_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::DEFAULT_CONCURRENCY,
            backoff_base_ms: defaults::DEFAULT_BACKOFF_BASE_MS,
            backoff_factor: defaults::DEFAULT_BACKOFF_FACTOR,
            backoff_cap_ms: defaults::DEFAULT_BACKOFF_CAP_MS,
            backoff_jitter: defaults::DEFAULT_BACKOFF_JITTER,
            default_max_attempts: defaults::DEFAULT_MAX_ATTEMPTS,
            default_max_duration_ms: defaults::DEFAULT_MAX_DURATION_MS,
        }
    }
}
