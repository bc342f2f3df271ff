use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tab lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    Active,
    Suspended,
    Restoring,
}

impl TabState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Restoring => "restoring",
        }
    }
}

/// Per-tab record. Mutated only through [`TabResourceManager`]'s
/// transition API.
///
/// [`TabResourceManager`]: crate::TabResourceManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    pub tab_id: String,
    pub memory_usage_bytes: u64,
    pub is_pinned: bool,
    /// Whether the tab currently has user focus.
    pub is_active: bool,
    pub last_active_at: DateTime<Utc>,
    pub state: TabState,
    /// Set when a restore attempt failed; the UI should offer a reload.
    pub needs_reload: bool,
}

/// One observation of a tab, delivered by the browser shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabTick {
    pub tab_id: String,
    pub memory_usage_bytes: u64,
    pub is_pinned: bool,
    pub is_active: bool,
}
