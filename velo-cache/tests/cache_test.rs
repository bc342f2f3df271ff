use chrono::{Duration, Utc};
use velo_cache::{AdmissionOutcome, CacheCandidate, PredictiveCache, RejectReason};
use velo_core::config::CacheConfig;

const MB: u64 = 1024 * 1024;

fn config_with_budget(budget_bytes: u64) -> CacheConfig {
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
fn admitted_entry_is_a_hit() {
    // Empty cache with a 5MB budget: a strong candidate goes straight in.
    let mut cache = PredictiveCache::new(config_with_budget(5 * MB));
    let outcome = cache.admit(&candidate("https://x.example/article", 0.9, MB));
    assert_eq!(outcome, AdmissionOutcome::Admitted);
    assert!(cache.lookup("https://x.example/article").is_hit());
    assert_eq!(cache.live_size_bytes(), MB);
}

#[test]
fn stronger_candidate_evicts_weaker_entry() {
    // Budget 1MB: the 0.9-probability candidate displaces the 0.5 one.
    let mut cache = PredictiveCache::new(CacheConfig {
        budget_bytes: MB,
        admission_threshold: 0.4,
        ..CacheConfig::default()
    });
    let weak = candidate("https://weak.example", 0.5, 600 * 1024);
    let strong = candidate("https://strong.example", 0.9, 600 * 1024);

    assert!(cache.admit(&weak).is_admitted());
    assert!(cache.admit(&strong).is_admitted());

    assert_eq!(cache.len(), 1);
    assert!(cache.lookup("https://strong.example").is_hit());
    assert!(!cache.lookup("https://weak.example").is_hit());
    assert!(cache.live_size_bytes() <= MB);
}

#[test]
fn equal_scores_are_not_evicted() {
    // Eviction only considers strictly lower-scored entries, so an equal
    // candidate cannot displace a fresh incumbent.
    let now = Utc::now();
    let mut cache = PredictiveCache::new(config_with_budget(MB));
    assert!(cache
        .admit_at(&candidate("https://first.example", 0.8, 700 * 1024), now)
        .is_admitted());
    let outcome = cache.admit_at(&candidate("https://second.example", 0.8, 700 * 1024), now);
    assert!(matches!(
        outcome,
        AdmissionOutcome::Rejected(RejectReason::InsufficientBudget { .. })
    ));
    assert!(cache.lookup_at("https://first.example", now).is_hit());
}

#[test]
fn eviction_prefers_lowest_score_then_oldest_access() {
    let now = Utc::now();
    let mut cache = PredictiveCache::new(CacheConfig {
        budget_bytes: MB,
        admission_threshold: 0.4,
        ..CacheConfig::default()
    });
    // Two equally weak entries, accessed at different times.
    assert!(cache
        .admit_at(&candidate("https://old.example", 0.5, 400 * 1024), now - Duration::seconds(120))
        .is_admitted());
    assert!(cache
        .admit_at(&candidate("https://new.example", 0.5, 400 * 1024), now)
        .is_admitted());
    // A strong candidate needing one eviction takes the older one.
    assert!(cache
        .admit_at(&candidate("https://strong.example", 0.9, 400 * 1024), now)
        .is_admitted());
    assert!(!cache.lookup_at("https://old.example", now).is_hit());
    assert!(cache.lookup_at("https://new.example", now).is_hit());
}

#[test]
fn ttl_expiry_is_unconditional() {
    let now = Utc::now();
    let mut cache = PredictiveCache::new(CacheConfig {
        budget_bytes: 5 * MB,
        ttl_secs: 60,
        ..CacheConfig::default()
    });
    assert!(cache
        .admit_at(&candidate("https://hot.example", 0.99, MB), now)
        .is_admitted());
    assert!(cache
        .admit_at(&candidate("https://warm.example", 0.7, MB), now)
        .is_admitted());

    // Even the highest-probability entry goes once its window elapses.
    let removed = cache.evict_expired_at(now + Duration::seconds(61));
    assert_eq!(removed, 2);
    assert!(cache.is_empty());
    assert_eq!(cache.live_size_bytes(), 0);
}

#[test]
fn hit_slides_the_ttl_window() {
    let now = Utc::now();
    let mut cache = PredictiveCache::new(CacheConfig {
        budget_bytes: 5 * MB,
        ttl_secs: 60,
        ..CacheConfig::default()
    });
    assert!(cache
        .admit_at(&candidate("https://a.example", 0.9, MB), now)
        .is_admitted());

    // Touch at t+50; the window now runs to t+110.
    assert!(cache.lookup_at("https://a.example", now + Duration::seconds(50)).is_hit());
    assert_eq!(cache.evict_expired_at(now + Duration::seconds(100)), 0);
    assert!(cache.lookup_at("https://a.example", now + Duration::seconds(100)).is_hit());

    // Left alone past the slid window, it expires.
    assert_eq!(cache.evict_expired_at(now + Duration::seconds(161)), 1);
}

#[test]
fn expired_entry_misses_on_lookup() {
    let now = Utc::now();
    let mut cache = PredictiveCache::new(CacheConfig {
        budget_bytes: MB,
        ttl_secs: 60,
        ..CacheConfig::default()
    });
    assert!(cache
        .admit_at(&candidate("https://a.example", 0.9, 1024), now)
        .is_admitted());
    assert!(!cache.lookup_at("https://a.example", now + Duration::seconds(61)).is_hit());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().expirations, 1);
}

#[test]
fn estimated_hit_probability_is_mean_of_live_entries() {
    let mut cache = PredictiveCache::new(config_with_budget(5 * MB));
    assert_eq!(cache.estimated_hit_probability(), 0.0);
    assert!(cache.admit(&candidate("https://a.example", 0.8, 10)).is_admitted());
    assert!(cache.admit(&candidate("https://b.example", 0.6, 10)).is_admitted());
    assert!((cache.estimated_hit_probability() - 0.7).abs() < 1e-9);
}
