use serde::{Deserialize, Serialize};

use super::defaults;

/// Predictive-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte budget for live entries. Admission keeps the sum of live entry
    /// sizes at or under this.
    pub budget_bytes: u64,
    /// Candidates below this probability are rejected outright.
    pub admission_threshold: f64,
    /// Sliding TTL window (seconds), refreshed on every hit.
    pub ttl_secs: u64,
    /// Weight of predicted probability in the entry score.
    pub probability_weight: f64,
    /// Weight of the recency factor in the entry score.
    pub recency_weight: f64,
    /// Age scale for the recency factor `1 / (1 + age/scale)`.
    pub recency_scale_secs: f64,
    /// Assumed entry size when a candidate carries no estimate.
    pub default_entry_size_bytes: u64,
    /// Interval between TTL sweeps (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: defaults::DEFAULT_CACHE_BUDGET_BYTES,
            admission_threshold: defaults::DEFAULT_ADMISSION_THRESHOLD,
            ttl_secs: defaults::DEFAULT_CACHE_TTL_SECS,
            probability_weight: defaults::DEFAULT_PROBABILITY_WEIGHT,
            recency_weight: defaults::DEFAULT_RECENCY_WEIGHT,
            recency_scale_secs: defaults::DEFAULT_RECENCY_SCALE_SECS,
            default_entry_size_bytes: defaults::DEFAULT_ENTRY_SIZE_BYTES,
            sweep_interval_secs: defaults::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}
