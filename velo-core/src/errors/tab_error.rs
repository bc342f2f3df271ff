/// Tab state-machine faults.
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    /// The requested transition is not legal from the tab's current state.
    /// The rejection is a no-op: state is left unchanged.
    #[error("invalid state transition for tab {tab_id}: {from} -> {to}")]
    InvalidStateTransition {
        tab_id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("unknown tab: {tab_id}")]
    UnknownTab { tab_id: String },
}
