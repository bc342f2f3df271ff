use serde::{Deserialize, Serialize};

use super::defaults;

/// Resource-monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling cadence (seconds).
    pub sample_interval_secs: u64,
    /// Consecutive read failures before the monitor reports unavailable.
    pub max_consecutive_failures: u32,
    /// Hold window before a pressure-level decrease is propagated (seconds).
    pub debounce_hold_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: defaults::DEFAULT_SAMPLE_INTERVAL_SECS,
            max_consecutive_failures: defaults::DEFAULT_MAX_CONSECUTIVE_FAILURES,
            debounce_hold_secs: defaults::DEFAULT_DEBOUNCE_HOLD_SECS,
        }
    }
}
