//! Default values for every tunable.
//!
//! Thresholds and score weights are deliberate configuration parameters:
//! the shipped values mirror current production behavior, and changing them
//! wants real telemetry, not invention.

/// Minimum predicted probability for cache admission.
pub const DEFAULT_ADMISSION_THRESHOLD: f64 = 0.6;

/// Total byte budget for live cache entries.
pub const DEFAULT_CACHE_BUDGET_BYTES: u64 = 64 * 1024 * 1024;

/// Sliding TTL for cache entries (seconds).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

/// Weight of predicted probability in the entry score.
pub const DEFAULT_PROBABILITY_WEIGHT: f64 = 0.7;

/// Weight of the recency factor in the entry score.
pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.3;

/// Age scale (seconds) for the recency factor `1 / (1 + age/scale)`.
pub const DEFAULT_RECENCY_SCALE_SECS: f64 = 300.0;

/// Size assumed for a candidate when the predictor gives no estimate.
pub const DEFAULT_ENTRY_SIZE_BYTES: u64 = 512 * 1024;

/// Interval between cache TTL sweeps (seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Idle time before an unpinned, inactive tab becomes suspendable (seconds).
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 300;

/// Base number of tabs suspended per escalation; scaled by overshoot.
pub const DEFAULT_SUSPENSION_BASE_K: usize = 5;

/// Worker-pool concurrency.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// First retry delay (milliseconds).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Multiplier applied to the delay per subsequent retry.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Ceiling on any retry delay (milliseconds).
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 60_000;

/// Jitter applied to retry delays (± fraction).
pub const DEFAULT_BACKOFF_JITTER: f64 = 0.2;

/// Attempts permitted per task unless the submission overrides it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-attempt duration ceiling (milliseconds).
pub const DEFAULT_MAX_DURATION_MS: u64 = 30_000;

/// Monitor sampling interval (seconds).
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;

/// Consecutive read failures before the monitor reports unavailable.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Hold window before a pressure-level decrease is propagated (seconds).
pub const DEFAULT_DEBOUNCE_HOLD_SECS: u64 = 15;
