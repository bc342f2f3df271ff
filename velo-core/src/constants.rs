/// Velo engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version stamped on every persisted snapshot record.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Utilization (percent) at or above which pressure is Medium.
pub const MEDIUM_PRESSURE_PCT: f64 = 70.0;

/// Utilization (percent) above which pressure is High.
pub const HIGH_PRESSURE_PCT: f64 = 85.0;

/// Utilization (percent) above which pressure is Critical.
pub const CRITICAL_PRESSURE_PCT: f64 = 95.0;
