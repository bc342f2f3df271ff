/// Predictive-cache faults.
///
/// A rejected admission is NOT an error; rejection is a value on the cache's
/// `Ok` path. The variants here are invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Live entries exceed the byte budget. Logged as a defect, never
    /// surfaced to callers.
    #[error("cache budget exceeded: {live_bytes} live bytes over budget of {budget_bytes}")]
    BudgetExceeded { live_bytes: u64, budget_bytes: u64 },
}
