//! Entry scoring for admission and eviction.
//!
//! ```text
//! score = probability * probability_weight + recency_factor * recency_weight
//! recency_factor = 1 / (1 + age_seconds / recency_scale_secs)
//! ```
//!
//! Eviction removes the lowest-scored entries first, ties broken by the
//! oldest `last_accessed_at`.

use chrono::{DateTime, Utc};
use velo_core::config::CacheConfig;

use crate::entry::CacheEntry;

/// Recency factor: 1.0 for a just-touched entry, decaying toward 0 as it
/// idles.
pub fn recency_factor(age_seconds: f64, scale_secs: f64) -> f64 {
    1.0 / (1.0 + age_seconds.max(0.0) / scale_secs)
}

/// Score of an existing entry at `now`.
pub fn compute(entry: &CacheEntry, config: &CacheConfig, now: DateTime<Utc>) -> f64 {
    let recency = recency_factor(entry.age_seconds(now), config.recency_scale_secs);
    entry.probability * config.probability_weight + recency * config.recency_weight
}

/// Score of a candidate not yet in the cache: age zero, so the recency
/// factor is exactly 1.
pub fn candidate_score(probability: f64, config: &CacheConfig) -> f64 {
    probability * config.probability_weight + config.recency_weight
}
