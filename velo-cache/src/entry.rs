use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Admitted; the speculative fetch has not completed yet.
    Pending,
    /// Fetch completed; the payload is usable.
    Fetched,
    /// Removed from the live set.
    Evicted,
}

/// A prefetch candidate admitted into the cache.
///
/// Owned exclusively by [`PredictiveCache`](crate::PredictiveCache);
/// nothing outside the store mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// blake3 hex digest of the URL; the store key.
    pub url_hash: String,
    pub url: String,
    pub estimated_size_bytes: u64,
    /// Predicted navigation probability at admission, in [0, 1].
    pub probability: f64,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every hit; the TTL window slides from here.
    pub last_accessed_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub state: EntryState,
}

impl CacheEntry {
    pub fn new(
        url: &str,
        probability: f64,
        estimated_size_bytes: u64,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            url_hash: hash_url(url),
            url: url.to_string(),
            estimated_size_bytes,
            probability: probability.clamp(0.0, 1.0),
            created_at: now,
            last_accessed_at: now,
            ttl_secs,
            state: EntryState::Pending,
        }
    }

    /// Seconds since the entry was last accessed. Never negative.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_accessed_at).num_milliseconds().max(0) as f64 / 1_000.0
    }

    /// Whether the sliding TTL window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_accessed_at > Duration::seconds(self.ttl_secs as i64)
    }

    pub fn is_live(&self) -> bool {
        self.state != EntryState::Evicted
    }
}

/// blake3 hex digest used as the store key for a URL.
pub fn hash_url(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_stable_and_distinct() {
        assert_eq!(hash_url("https://a.example"), hash_url("https://a.example"));
        assert_ne!(hash_url("https://a.example"), hash_url("https://b.example"));
    }

    #[test]
    fn ttl_window_slides_from_last_access() {
        let now = Utc::now();
        let mut entry = CacheEntry::new("https://a.example", 0.9, 1024, 60, now);
        assert!(!entry.is_expired(now + Duration::seconds(59)));
        assert!(entry.is_expired(now + Duration::seconds(61)));

        entry.last_accessed_at = now + Duration::seconds(50);
        assert!(!entry.is_expired(now + Duration::seconds(100)));
    }

    #[test]
    fn probability_is_clamped() {
        let now = Utc::now();
        assert_eq!(CacheEntry::new("u", 1.7, 0, 60, now).probability, 1.0);
        assert_eq!(CacheEntry::new("u", -0.2, 0, 60, now).probability, 0.0);
    }
}
