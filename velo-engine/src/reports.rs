//! Façade operation results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use velo_core::models::ResourceSnapshot;
use velo_scheduler::{TaskPriority, TaskSummary};

use crate::recommendations::Recommendation;

/// Result of `predictive_caching`.
#[derive(Debug, Clone, Serialize)]
pub struct CachingReport {
    /// URLs admitted this round, highest probability first.
    pub cache_admissions: Vec<String>,
    /// Mean predicted probability across live entries.
    pub cache_hit_probability: f64,
    /// Name of the predictor that ranked the candidates.
    pub strategy: String,
}

/// Result of `memory_management`.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    /// Tabs submitted for suspension, heaviest first.
    pub suspended_tab_ids: Vec<String>,
    /// Suspended tabs that saw interaction and are being restored.
    pub restoration_triggers: Vec<String>,
    /// Memory the submitted suspensions are expected to release.
    pub freed_bytes_estimate: u64,
}

/// Receipt for `background_processing`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReceipt {
    pub task_id: Uuid,
    pub priority: TaskPriority,
    /// Rough completion estimate from queue depth and per-task budget.
    pub estimated_completion: DateTime<Utc>,
}

/// Result of `performance_monitoring`.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringReport {
    pub resource_snapshot: ResourceSnapshot,
    pub recommendations: Vec<Recommendation>,
    pub active_task_summary: TaskSummary,
}
