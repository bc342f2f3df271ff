//! The tab table and its transition API.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use velo_core::config::SuspensionConfig;
use velo_core::errors::TabError;
use velo_core::models::PressureLevel;
use velo_core::VeloResult;

use crate::record::{TabRecord, TabState, TabTick};

/// Owns every [`TabRecord`] and enforces the transition rules.
///
/// Mutations are serialized by `&mut self`; the engine wraps the manager in
/// one lock. Candidate evaluation is pure and never blocks.
pub struct TabResourceManager {
    config: SuspensionConfig,
    tabs: HashMap<String, TabRecord>,
}

impl TabResourceManager {
    pub fn new(config: SuspensionConfig) -> Self {
        Self {
            config,
            tabs: HashMap::new(),
        }
    }

    /// Register a tab, or update its pinned flag if already known.
    pub fn register_tab(&mut self, tab_id: &str, is_pinned: bool) {
        self.register_tab_at(tab_id, is_pinned, Utc::now());
    }

    pub fn register_tab_at(&mut self, tab_id: &str, is_pinned: bool, now: DateTime<Utc>) {
        self.tabs
            .entry(tab_id.to_string())
            .and_modify(|record| record.is_pinned = is_pinned)
            .or_insert_with(|| TabRecord {
                tab_id: tab_id.to_string(),
                memory_usage_bytes: 0,
                is_pinned,
                is_active: true,
                last_active_at: now,
                state: TabState::Active,
                needs_reload: false,
            });
    }

    /// Forget a closed tab.
    pub fn unregister_tab(&mut self, tab_id: &str) -> Option<TabRecord> {
        self.tabs.remove(tab_id)
    }

    /// Update a known tab's usage and activity.
    pub fn tick(&mut self, tab_id: &str, memory_usage_bytes: u64, is_active: bool) -> VeloResult<()> {
        self.tick_at(tab_id, memory_usage_bytes, is_active, Utc::now())
    }

    pub fn tick_at(
        &mut self,
        tab_id: &str,
        memory_usage_bytes: u64,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> VeloResult<()> {
        let record = self.tabs.get_mut(tab_id).ok_or_else(|| TabError::UnknownTab {
            tab_id: tab_id.to_string(),
        })?;
        record.memory_usage_bytes = memory_usage_bytes;
        record.is_active = is_active;
        if is_active {
            record.last_active_at = now;
        }
        Ok(())
    }

    /// Apply an observation, registering the tab first if it is unseen.
    pub fn apply(&mut self, tick: &TabTick) {
        self.apply_at(tick, Utc::now());
    }

    pub fn apply_at(&mut self, tick: &TabTick, now: DateTime<Utc>) {
        self.register_tab_at(&tick.tab_id, tick.is_pinned, now);
        // The tab exists now; the update cannot fail.
        if let Some(record) = self.tabs.get_mut(&tick.tab_id) {
            record.memory_usage_bytes = tick.memory_usage_bytes;
            record.is_active = tick.is_active;
            if tick.is_active {
                record.last_active_at = now;
            }
        }
    }

    /// Rank suspension candidates: unpinned, inactive, idle past the
    /// threshold, ordered by memory usage descending with ties going to
    /// the longest-idle tab. Empty below High pressure.
    ///
    /// Pinned and active tabs are excluded here, and callers re-check at
    /// submission time because the list can go stale.
    pub fn evaluate_suspension_candidates(&self, pressure: PressureLevel) -> Vec<String> {
        self.evaluate_suspension_candidates_at(pressure, Utc::now())
    }

    pub fn evaluate_suspension_candidates_at(
        &self,
        pressure: PressureLevel,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        if !pressure.is_elevated() {
            return Vec::new();
        }
        let idle_cutoff = Duration::seconds(self.config.idle_threshold_secs as i64);
        let mut eligible: Vec<&TabRecord> = self
            .tabs
            .values()
            .filter(|record| {
                record.state == TabState::Active
                    && !record.is_pinned
                    && !record.is_active
                    && now - record.last_active_at > idle_cutoff
            })
            .collect();
        eligible.sort_by(|a, b| {
            b.memory_usage_bytes
                .cmp(&a.memory_usage_bytes)
                .then_with(|| a.last_active_at.cmp(&b.last_active_at))
        });
        eligible.into_iter().map(|record| record.tab_id.clone()).collect()
    }

    /// `Active -> Suspended`. Pinned tabs are refused: they never reach
    /// `Suspended`.
    pub fn mark_suspended(&mut self, tab_id: &str) -> VeloResult<()> {
        let record = self.get_mut(tab_id)?;
        if record.state != TabState::Active || record.is_pinned {
            return Err(invalid(record, "suspended"));
        }
        record.state = TabState::Suspended;
        debug!(tab_id, "tab suspended");
        Ok(())
    }

    /// `Suspended -> Restoring`, on a navigation or interaction event.
    pub fn mark_restoring(&mut self, tab_id: &str) -> VeloResult<()> {
        let record = self.get_mut(tab_id)?;
        if record.state != TabState::Suspended {
            return Err(invalid(record, "restoring"));
        }
        record.state = TabState::Restoring;
        debug!(tab_id, "tab restoring");
        Ok(())
    }

    /// `Restoring -> Active` on a successful restore. Calling this on an
    /// already-Active tab is an idempotent no-op.
    pub fn mark_active(&mut self, tab_id: &str) -> VeloResult<()> {
        self.mark_active_at(tab_id, Utc::now())
    }

    pub fn mark_active_at(&mut self, tab_id: &str, now: DateTime<Utc>) -> VeloResult<()> {
        let record = self.get_mut(tab_id)?;
        match record.state {
            TabState::Active => Ok(()),
            TabState::Restoring => {
                record.state = TabState::Active;
                record.needs_reload = false;
                record.is_active = true;
                record.last_active_at = now;
                debug!(tab_id, "tab restored");
                Ok(())
            }
            TabState::Suspended => Err(invalid(record, "active")),
        }
    }

    /// `Restoring -> Suspended` after a failed restore; the tab is flagged
    /// for a user-visible reload rather than silently dropped.
    pub fn mark_restore_failed(&mut self, tab_id: &str) -> VeloResult<()> {
        let record = self.get_mut(tab_id)?;
        if record.state != TabState::Restoring {
            return Err(invalid(record, "suspended"));
        }
        record.state = TabState::Suspended;
        record.needs_reload = true;
        debug!(tab_id, "restore failed; tab flagged needs_reload");
        Ok(())
    }

    pub fn get(&self, tab_id: &str) -> Option<&TabRecord> {
        self.tabs.get(tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Iterate all records, e.g. for snapshot export.
    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.tabs.values()
    }

    /// Total memory held by suspended tabs (an estimate from their last
    /// reported usage).
    pub fn suspended_memory_estimate(&self) -> u64 {
        self.tabs
            .values()
            .filter(|record| record.state == TabState::Suspended)
            .map(|record| record.memory_usage_bytes)
            .sum()
    }

    /// Restore records from a snapshot. A tab caught mid-restore lands as
    /// `Suspended` with `needs_reload` set: the in-flight restore did not
    /// survive the restart.
    pub fn restore(&mut self, records: Vec<TabRecord>) {
        for mut record in records {
            if record.state == TabState::Restoring {
                record.state = TabState::Suspended;
                record.needs_reload = true;
            }
            self.tabs.insert(record.tab_id.clone(), record);
        }
    }

    fn get_mut(&mut self, tab_id: &str) -> Result<&mut TabRecord, TabError> {
        self.tabs.get_mut(tab_id).ok_or_else(|| TabError::UnknownTab {
            tab_id: tab_id.to_string(),
        })
    }
}

fn invalid(record: &TabRecord, to: &'static str) -> velo_core::VeloError {
    TabError::InvalidStateTransition {
        tab_id: record.tab_id.clone(),
        from: record.state.as_str(),
        to,
    }
    .into()
}
