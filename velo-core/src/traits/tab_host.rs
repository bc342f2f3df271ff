use crate::errors::VeloResult;

/// Host-provided tab suspend/restore primitives.
///
/// These may block; they are invoked only from inside worker task bodies,
/// never from decision functions.
pub trait ITabHost: Send + Sync {
    /// Release the tab's in-memory footprint, keeping enough metadata to
    /// restore it later. Returns the bytes freed.
    fn suspend_tab(&self, tab_id: &str) -> VeloResult<u64>;

    /// Bring a suspended tab back into memory.
    fn restore_tab(&self, tab_id: &str) -> VeloResult<()>;
}
