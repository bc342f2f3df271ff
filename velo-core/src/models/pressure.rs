use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{CRITICAL_PRESSURE_PCT, HIGH_PRESSURE_PCT, MEDIUM_PRESSURE_PCT};

/// Coarse classification of system resource scarcity.
///
/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PressureLevel {
    /// Classify utilization percentages into a pressure level.
    ///
    /// The higher of memory and CPU drives the classification:
    /// Low <70%, Medium 70-85%, High 85-95%, Critical >95%.
    pub fn from_utilization(memory_used_pct: f64, cpu_used_pct: f64) -> Self {
        let worst = memory_used_pct.max(cpu_used_pct);
        if worst > CRITICAL_PRESSURE_PCT {
            Self::Critical
        } else if worst > HIGH_PRESSURE_PCT {
            Self::High
        } else if worst >= MEDIUM_PRESSURE_PCT {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Whether this level calls for shedding load (High or Critical).
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Immutable utilization sample produced by the resource monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// When the underlying readings were taken.
    pub timestamp: DateTime<Utc>,
    pub memory_used_pct: f64,
    pub cpu_used_pct: f64,
    pub pressure_level: PressureLevel,
    /// True when this is a re-served last-known sample after a read failure.
    pub stale: bool,
}

impl ResourceSnapshot {
    /// Build a fresh snapshot, classifying pressure from the readings.
    pub fn new(timestamp: DateTime<Utc>, memory_used_pct: f64, cpu_used_pct: f64) -> Self {
        Self {
            timestamp,
            memory_used_pct,
            cpu_used_pct,
            pressure_level: PressureLevel::from_utilization(memory_used_pct, cpu_used_pct),
            stale: false,
        }
    }

    /// The conservative default dependents assume when the monitor is
    /// unavailable: Medium pressure, flagged stale.
    pub fn assumed_medium(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            memory_used_pct: MEDIUM_PRESSURE_PCT,
            cpu_used_pct: MEDIUM_PRESSURE_PCT,
            pressure_level: PressureLevel::Medium,
            stale: true,
        }
    }

    /// Copy of this snapshot flagged stale. The timestamp is kept: it
    /// reports when the data was true, not when it was re-served.
    pub fn as_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}
