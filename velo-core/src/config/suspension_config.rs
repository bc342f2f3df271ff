use serde::{Deserialize, Serialize};

use super::defaults;

/// Tab-suspension configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    /// Seconds a tab must be idle before it is eligible for suspension.
    pub idle_threshold_secs: u64,
    /// Base top-K suspended per escalation; scaled by pressure overshoot.
    pub base_top_k: usize,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: defaults::DEFAULT_IDLE_THRESHOLD_SECS,
            base_top_k: defaults::DEFAULT_SUSPENSION_BASE_K,
        }
    }
}
