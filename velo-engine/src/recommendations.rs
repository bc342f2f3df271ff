//! Actionable recommendations derived from current engine state.

use serde::{Deserialize, Serialize};
use velo_cache::CacheStats;
use velo_core::models::{PressureLevel, ResourceSnapshot};
use velo_scheduler::TaskSummary;

/// Severity of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// An actionable recommendation surfaced through the monitoring façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
    pub action: String,
}

/// Generate recommendations from the snapshot, cache counters, and task
/// summary.
pub fn generate(
    snapshot: &ResourceSnapshot,
    cache: &CacheStats,
    tasks: &TaskSummary,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if snapshot.pressure_level.is_elevated() {
        let severity = if snapshot.pressure_level == PressureLevel::Critical {
            Severity::Critical
        } else {
            Severity::Warning
        };
        recs.push(Recommendation {
            severity,
            message: format!(
                "resource pressure is {:?}: {:.0}% memory, {:.0}% cpu",
                snapshot.pressure_level, snapshot.memory_used_pct, snapshot.cpu_used_pct
            ),
            action: "suspend idle tabs to free memory".into(),
        });
    }

    if snapshot.stale {
        recs.push(Recommendation {
            severity: Severity::Warning,
            message: "resource readings are stale".into(),
            action: "check monitor availability".into(),
        });
    }

    let lookups = cache.hits + cache.misses;
    if lookups >= 20 && cache.hit_rate() < 0.30 {
        recs.push(Recommendation {
            severity: Severity::Warning,
            message: format!("cache hit rate is {:.0}%", cache.hit_rate() * 100.0),
            action: "revisit the admission threshold or predictor quality".into(),
        });
    }

    let decisions = cache.admissions + cache.rejections;
    if decisions >= 20 && cache.rejections > cache.admissions {
        recs.push(Recommendation {
            severity: Severity::Info,
            message: format!(
                "{} of {} prefetch candidates were rejected",
                cache.rejections, decisions
            ),
            action: "lower the admission threshold if budget allows".into(),
        });
    }

    if tasks.failed > 0 {
        recs.push(Recommendation {
            severity: Severity::Warning,
            message: format!("{} background tasks failed permanently", tasks.failed),
            action: "inspect task logs for the failing kind".into(),
        });
    }

    if tasks.queued > 50 {
        recs.push(Recommendation {
            severity: Severity::Warning,
            message: format!("{} tasks are waiting in the queue", tasks.queued),
            action: "raise worker concurrency or shed low-priority work".into(),
        });
    }

    recs
}
