//! The predictive cache store: admission, lookup, eviction, sweeps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use velo_core::config::CacheConfig;
use velo_core::errors::CacheError;

use crate::entry::{hash_url, CacheEntry, EntryState};
use crate::score;

/// A candidate offered to [`PredictiveCache::admit`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheCandidate {
    pub url: String,
    pub probability: f64,
    pub estimated_size_bytes: u64,
}

/// Why a candidate was not admitted. Normal control flow, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Probability under the configured admission threshold.
    BelowThreshold { probability: f64, threshold: f64 },
    /// Even evicting every strictly-lower-scored entry would not free
    /// enough budget for the candidate.
    InsufficientBudget {
        required_bytes: u64,
        reclaimable_bytes: u64,
    },
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionOutcome {
    Admitted,
    Rejected(RejectReason),
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Outcome of a lookup. A hit clones the entry metadata for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Hit(CacheEntry),
    Miss,
}

impl LookupOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Hit/miss/eviction counters for the monitoring façade.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub admissions: u64,
    pub rejections: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache. 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Admission-controlled, budget-bounded store of prefetch candidates.
///
/// Invariant: the sum of `estimated_size_bytes` over live entries never
/// exceeds `config.budget_bytes`; it is re-checked after every mutation.
pub struct PredictiveCache {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    live_bytes: u64,
    stats: CacheStats,
}

impl PredictiveCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            live_bytes: 0,
            stats: CacheStats::default(),
        }
    }

    /// Decide whether `candidate` enters the cache, evicting strictly
    /// lower-scored entries if the budget requires it.
    ///
    /// Never blocks and performs no I/O; the fetch itself is scheduled by
    /// the caller after admission.
    pub fn admit(&mut self, candidate: &CacheCandidate) -> AdmissionOutcome {
        self.admit_at(candidate, Utc::now())
    }

    /// [`admit`](Self::admit) with an explicit clock, for deterministic
    /// tests.
    pub fn admit_at(&mut self, candidate: &CacheCandidate, now: DateTime<Utc>) -> AdmissionOutcome {
        let threshold = self.config.admission_threshold;
        if candidate.probability < threshold {
            self.stats.rejections += 1;
            return AdmissionOutcome::Rejected(RejectReason::BelowThreshold {
                probability: candidate.probability,
                threshold,
            });
        }

        let key = hash_url(&candidate.url);
        let candidate_score = score::candidate_score(candidate.probability, &self.config);

        match self.plan_eviction(candidate.estimated_size_bytes, candidate_score, &key, now) {
            Ok(victims) => {
                // Re-admission replaces the previous entry for the URL.
                if let Some(previous) = self.entries.remove(&key) {
                    self.live_bytes -= previous.estimated_size_bytes;
                }
                for victim in victims {
                    self.remove_entry(&victim);
                    self.stats.evictions += 1;
                }
                let entry = CacheEntry::new(
                    &candidate.url,
                    candidate.probability,
                    candidate.estimated_size_bytes,
                    self.config.ttl_secs,
                    now,
                );
                debug!(url = %entry.url, size = entry.estimated_size_bytes, probability = entry.probability, "cache admission");
                self.live_bytes += entry.estimated_size_bytes;
                self.entries.insert(entry.url_hash.clone(), entry);
                self.stats.admissions += 1;
                self.check_budget();
                AdmissionOutcome::Admitted
            }
            Err(reject) => {
                self.stats.rejections += 1;
                AdmissionOutcome::Rejected(reject)
            }
        }
    }

    /// Look a URL up. A hit refreshes `last_accessed_at`, sliding the TTL
    /// window; an expired entry is removed and reported as a miss.
    pub fn lookup(&mut self, url: &str) -> LookupOutcome {
        self.lookup_at(url, Utc::now())
    }

    pub fn lookup_at(&mut self, url: &str, now: DateTime<Utc>) -> LookupOutcome {
        let key = hash_url(url);
        let expired = match self.entries.get_mut(&key) {
            None => {
                self.stats.misses += 1;
                return LookupOutcome::Miss;
            }
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => {
                entry.last_accessed_at = now;
                self.stats.hits += 1;
                return LookupOutcome::Hit(entry.clone());
            }
        };
        if expired {
            self.remove_entry(&key);
            self.stats.expirations += 1;
        }
        self.stats.misses += 1;
        LookupOutcome::Miss
    }

    /// Sweep TTL-expired entries unconditionally, independent of score.
    /// Returns the number of entries removed.
    pub fn evict_expired(&mut self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.url_hash.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
            self.stats.expirations += 1;
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "ttl sweep removed expired entries");
        }
        expired.len()
    }

    /// Record a completed fetch, correcting the size estimate when the real
    /// size is known. Returns false if the URL is no longer in the cache.
    pub fn mark_fetched(&mut self, url: &str, actual_size_bytes: Option<u64>) -> bool {
        self.mark_fetched_at(url, actual_size_bytes, Utc::now())
    }

    pub fn mark_fetched_at(
        &mut self,
        url: &str,
        actual_size_bytes: Option<u64>,
        now: DateTime<Utc>,
    ) -> bool {
        let key = hash_url(url);
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        entry.state = EntryState::Fetched;
        if let Some(actual) = actual_size_bytes {
            self.live_bytes = self.live_bytes - entry.estimated_size_bytes + actual;
            entry.estimated_size_bytes = actual;
        }
        // A corrected size can push past the budget; shed the lowest-scored
        // entries until the invariant holds again.
        self.rebalance(now);
        true
    }

    /// A failed fetch for an admitted-but-unfetched entry evicts it
    /// immediately. Retrying is the caller's business via the scheduler,
    /// not the cache's.
    pub fn mark_fetch_failed(&mut self, url: &str) -> bool {
        let key = hash_url(url);
        if self.entries.contains_key(&key) {
            self.remove_entry(&key);
            self.stats.evictions += 1;
            debug!(url, "entry evicted after fetch failure");
            true
        } else {
            false
        }
    }

    /// Mean predicted probability of live entries; the façade's
    /// cache-hit-probability signal. 0 when empty.
    pub fn estimated_hit_probability(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.entries.values().map(|entry| entry.probability).sum();
        sum / self.entries.len() as f64
    }

    pub fn live_size_bytes(&self) -> u64 {
        self.live_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Iterate live entries, e.g. for snapshot export.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// Restore entries from a snapshot. Entries that would break the budget
    /// are dropped with a warning; a snapshot taken under the invariant
    /// restores completely.
    pub fn restore(&mut self, entries: Vec<CacheEntry>) {
        for entry in entries {
            if !entry.is_live() {
                continue;
            }
            if self.live_bytes + entry.estimated_size_bytes > self.config.budget_bytes {
                warn!(url = %entry.url, "snapshot entry dropped: would exceed budget");
                continue;
            }
            self.live_bytes += entry.estimated_size_bytes;
            self.entries.insert(entry.url_hash.clone(), entry);
        }
        self.check_budget();
    }

    /// Select the lowest-scored entries strictly below `candidate_score`
    /// until enough budget is reclaimable. Pure planning; mutates nothing.
    fn plan_eviction(
        &self,
        candidate_size: u64,
        candidate_score: f64,
        replacing_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, RejectReason> {
        let replaced_bytes = self
            .entries
            .get(replacing_key)
            .map(|entry| entry.estimated_size_bytes)
            .unwrap_or(0);
        let effective_live = self.live_bytes - replaced_bytes;
        let needed = (effective_live + candidate_size).saturating_sub(self.config.budget_bytes);
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut evictable: Vec<(f64, DateTime<Utc>, String, u64)> = self
            .entries
            .values()
            .filter(|entry| entry.url_hash != replacing_key)
            .map(|entry| {
                (
                    score::compute(entry, &self.config, now),
                    entry.last_accessed_at,
                    entry.url_hash.clone(),
                    entry.estimated_size_bytes,
                )
            })
            .filter(|(entry_score, ..)| *entry_score < candidate_score)
            .collect();
        // Lowest score first; ties broken by the oldest access.
        evictable.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut victims = Vec::new();
        let mut reclaimed = 0u64;
        for (_, _, key, size) in &evictable {
            if reclaimed >= needed {
                break;
            }
            victims.push(key.clone());
            reclaimed += size;
        }
        if reclaimed < needed {
            return Err(RejectReason::InsufficientBudget {
                required_bytes: needed,
                reclaimable_bytes: reclaimed,
            });
        }
        Ok(victims)
    }

    /// Shed the lowest-scored entries until the budget invariant holds.
    fn rebalance(&mut self, now: DateTime<Utc>) {
        while self.live_bytes > self.config.budget_bytes {
            let victim = self
                .entries
                .values()
                .map(|entry| {
                    (
                        score::compute(entry, &self.config, now),
                        entry.last_accessed_at,
                        entry.url_hash.clone(),
                    )
                })
                .min_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
            match victim {
                Some((_, _, key)) => {
                    self.remove_entry(&key);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }

    fn remove_entry(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.live_bytes -= entry.estimated_size_bytes;
        }
    }

    fn check_budget(&self) {
        if self.live_bytes > self.config.budget_bytes {
            // Invariant defect: log loudly, never surface to the caller.
            let defect = CacheError::BudgetExceeded {
                live_bytes: self.live_bytes,
                budget_bytes: self.config.budget_bytes,
            };
            error!(%defect, "cache budget invariant violated");
            debug_assert!(false, "cache budget invariant violated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(budget_bytes: u64) -> CacheConfig {
        CacheConfig {
            budget_bytes,
            ..CacheConfig::default()
        }
    }

    fn candidate(url: &str, probability: f64, size: u64) -> CacheCandidate {
        CacheCandidate {
            url: url.to_string(),
            probability,
            estimated_size_bytes: size,
        }
    }

    #[test]
    fn rejects_below_threshold() {
        let mut cache = PredictiveCache::new(small_config(1024));
        let outcome = cache.admit(&candidate("https://a.example", 0.5, 100));
        assert_eq!(
            outcome,
            AdmissionOutcome::Rejected(RejectReason::BelowThreshold {
                probability: 0.5,
                threshold: 0.6,
            })
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn rejects_candidate_larger_than_whole_budget() {
        let mut cache = PredictiveCache::new(small_config(1024));
        let outcome = cache.admit(&candidate("https://a.example", 0.9, 4096));
        assert!(matches!(
            outcome,
            AdmissionOutcome::Rejected(RejectReason::InsufficientBudget { .. })
        ));
    }

    #[test]
    fn readmission_replaces_without_double_counting() {
        let mut cache = PredictiveCache::new(small_config(1024));
        assert!(cache.admit(&candidate("https://a.example", 0.7, 600)).is_admitted());
        assert!(cache.admit(&candidate("https://a.example", 0.9, 700)).is_admitted());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live_size_bytes(), 700);
    }

    #[test]
    fn failed_readmission_keeps_previous_entry() {
        let now = Utc::now();
        let mut cache = PredictiveCache::new(small_config(1_000));
        assert!(cache
            .admit_at(&candidate("https://a.example", 0.7, 600), now)
            .is_admitted());
        // Same score tier but too large even after replacing itself.
        let outcome = cache.admit_at(&candidate("https://a.example", 0.7, 2_000), now);
        assert!(!outcome.is_admitted());
        assert_eq!(cache.live_size_bytes(), 600);
        assert!(cache.lookup_at("https://a.example", now).is_hit());
    }

    #[test]
    fn fetch_failure_evicts_pending_entry() {
        let mut cache = PredictiveCache::new(small_config(1024));
        assert!(cache.admit(&candidate("https://a.example", 0.9, 100)).is_admitted());
        assert!(cache.mark_fetch_failed("https://a.example"));
        assert!(cache.is_empty());
        assert_eq!(cache.live_size_bytes(), 0);
        assert!(!cache.mark_fetch_failed("https://a.example"));
    }

    #[test]
    fn mark_fetched_corrects_size_and_rebalances() {
        let mut cache = PredictiveCache::new(small_config(1_000));
        assert!(cache.admit(&candidate("https://a.example", 0.7, 400)).is_admitted());
        assert!(cache.admit(&candidate("https://b.example", 0.9, 400)).is_admitted());
        // The real payload is larger than estimated; the lower-scored entry
        // is shed to restore the invariant.
        assert!(cache.mark_fetched("https://b.example", Some(900)));
        assert!(cache.live_size_bytes() <= 1_000);
        assert!(cache.lookup("https://b.example").is_hit());
        assert!(!cache.lookup("https://a.example").is_hit());
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let mut cache = PredictiveCache::new(small_config(1024));
        assert!(cache.admit(&candidate("https://a.example", 0.9, 10)).is_admitted());
        assert!(cache.lookup("https://a.example").is_hit());
        assert!(!cache.lookup("https://missing.example").is_hit());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
