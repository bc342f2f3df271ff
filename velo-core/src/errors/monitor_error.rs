/// Resource-monitor failures.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Raised after repeated consecutive read failures. Dependents fall
    /// back to assuming Medium pressure instead of blocking on the monitor.
    #[error("resource monitor unavailable after {consecutive_failures} consecutive read failures")]
    Unavailable { consecutive_failures: u32 },

    /// A read failed before any sample was ever taken, so there is no
    /// last-known snapshot to re-serve.
    #[error("resource sample failed: {reason}")]
    SampleFailed { reason: String },
}
