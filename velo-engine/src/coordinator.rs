//! The coordinator: wires the monitor, cache, tabs, and scheduler into
//! the façade operations the browser shell calls.
//!
//! Decision-making happens inline and never blocks; everything that can
//! block (fetches, host suspend/restore calls) runs inside scheduler task
//! bodies. The monitor's pressure-change reaction is itself dispatched as
//! a scheduler task so the sampling loop is never held up by downstream
//! work.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use velo_cache::{CacheCandidate, CacheStats, PredictiveCache};
use velo_core::config::VeloConfig;
use velo_core::constants::HIGH_PRESSURE_PCT;
use velo_core::errors::TaskError;
use velo_core::models::{NavigationContext, ResourceSnapshot};
use velo_core::traits::{Cancellable, INavigationPredictor, IPrefetchFetcher, ITabHost};
use velo_core::VeloResult;
use velo_monitor::{MonitorHandle, ResourceMonitor};
use velo_scheduler::{
    BackgroundTaskScheduler, TaskDescriptor, TaskFuture, TaskPriority, TaskSpec, TaskState,
};
use velo_tabs::{TabRecord, TabResourceManager, TabState, TabTick};

use crate::persistence;
use crate::recommendations;
use crate::reports::{CachingReport, MemoryReport, MonitoringReport, ProcessingReceipt};
use crate::session::SessionManager;

/// Task kinds the coordinator schedules and understands in
/// [`background_processing`](PerformanceOptimizationCoordinator::background_processing).
pub mod task_kinds {
    pub const PREFETCH: &str = "prefetch";
    pub const SUSPEND_TAB: &str = "suspend_tab";
    pub const RESTORE_TAB: &str = "restore_tab";
    pub const CACHE_SWEEP: &str = "cache_sweep";
    pub const REBALANCE: &str = "rebalance";
}

/// Façade over the whole resource-management engine.
pub struct PerformanceOptimizationCoordinator {
    config: VeloConfig,
    cache: Arc<Mutex<PredictiveCache>>,
    tabs: Arc<Mutex<TabResourceManager>>,
    scheduler: BackgroundTaskScheduler,
    sessions: SessionManager,
    monitor: ResourceMonitor,
    predictor: Arc<dyn INavigationPredictor>,
    tab_host: Arc<dyn ITabHost>,
    fetcher: Arc<dyn IPrefetchFetcher>,
}

impl PerformanceOptimizationCoordinator {
    /// Build the engine and start its scheduler.
    ///
    /// Must be called from within a tokio runtime: the scheduler spawns
    /// its worker pool immediately, and façade operations spawn watcher
    /// tasks.
    pub fn new(
        config: VeloConfig,
        monitor: ResourceMonitor,
        predictor: Arc<dyn INavigationPredictor>,
        tab_host: Arc<dyn ITabHost>,
        fetcher: Arc<dyn IPrefetchFetcher>,
    ) -> Self {
        let scheduler = BackgroundTaskScheduler::start(config.scheduler.clone());
        let cache = Arc::new(Mutex::new(PredictiveCache::new(config.cache.clone())));
        let tabs = Arc::new(Mutex::new(TabResourceManager::new(config.suspension.clone())));
        info!(predictor = predictor.name(), "performance coordinator started");
        Self {
            config,
            cache,
            tabs,
            scheduler,
            sessions: SessionManager::new(),
            monitor,
            predictor,
            tab_host,
            fetcher,
        }
    }

    /// Subscribe to the monitor. Each (debounced) pressure-level change is
    /// dispatched as a High-priority rebalance task.
    pub fn attach_monitor(self: &Arc<Self>) -> MonitorHandle {
        let coordinator = Arc::clone(self);
        self.monitor.subscribe(move |snapshot| {
            let for_task = Arc::clone(&coordinator);
            let spec = TaskSpec::new(
                TaskDescriptor::new(task_kinds::REBALANCE),
                TaskPriority::High,
                Box::new(move |_token| -> TaskFuture {
                    let coordinator = Arc::clone(&for_task);
                    Box::pin(async move {
                        coordinator.on_pressure_change(snapshot);
                        Ok(())
                    })
                }),
            )
            .with_max_attempts(1);
            coordinator.scheduler.submit(spec);
        })
    }

    /// Spawn the periodic cache TTL sweep. Stops when the engine's runtime
    /// shuts down.
    pub fn start_cache_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let interval = Duration::from_secs(self.config.cache.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = coordinator.cache().evict_expired();
                if removed > 0 {
                    debug!(removed, "cache sweep");
                }
            }
        })
    }

    /// Façade: rank likely navigations, admit the strong ones, and
    /// schedule their prefetches.
    pub fn predictive_caching(
        &self,
        session_id: &str,
        current_url: &str,
        context: &NavigationContext,
    ) -> VeloResult<CachingReport> {
        self.sessions.record_navigation(session_id, current_url);
        let predictions = self.predictor.predict(current_url, context)?;

        let mut admitted = Vec::new();
        {
            let mut cache = self.cache();
            for prediction in &predictions {
                let candidate = CacheCandidate {
                    url: prediction.url.clone(),
                    probability: prediction.probability,
                    estimated_size_bytes: self.config.cache.default_entry_size_bytes,
                };
                if cache.admit(&candidate).is_admitted() {
                    admitted.push(prediction.url.clone());
                }
            }
        }
        for url in &admitted {
            self.submit_prefetch(url.clone());
        }
        self.sessions
            .record_prefetch_submissions(session_id, admitted.len() as u64);

        let report = CachingReport {
            cache_admissions: admitted,
            cache_hit_probability: self.cache().estimated_hit_probability(),
            strategy: self.predictor.name().to_string(),
        };
        debug!(
            session_id,
            current_url,
            admissions = report.cache_admissions.len(),
            "predictive caching round"
        );
        Ok(report)
    }

    /// Façade: apply tab observations, trigger restores for touched
    /// suspended tabs, and shed idle tabs under elevated pressure.
    pub fn memory_management(
        &self,
        tab_snapshots: &[TabTick],
        resource_snapshot: &ResourceSnapshot,
    ) -> VeloResult<MemoryReport> {
        let touched_suspended: Vec<String> = {
            let mut tabs = self.tabs();
            let mut touched = Vec::new();
            for tick in tab_snapshots {
                let was_suspended = tabs
                    .get(&tick.tab_id)
                    .map(|record| record.state == TabState::Suspended)
                    .unwrap_or(false);
                tabs.apply(tick);
                if was_suspended && tick.is_active {
                    touched.push(tick.tab_id.clone());
                }
            }
            touched
        };

        let mut restoration_triggers = Vec::new();
        for tab_id in touched_suspended {
            if self.submit_restore(tab_id.clone()).is_some() {
                restoration_triggers.push(tab_id);
            }
        }

        let mut suspended_tab_ids = Vec::new();
        let mut freed_bytes_estimate = 0u64;
        if resource_snapshot.pressure_level.is_elevated() {
            let candidates = self
                .tabs()
                .evaluate_suspension_candidates(resource_snapshot.pressure_level);
            let top_k = self.suspension_top_k(resource_snapshot);
            for tab_id in candidates.into_iter().take(top_k) {
                let estimate = self
                    .tabs()
                    .get(&tab_id)
                    .map(|record| record.memory_usage_bytes)
                    .unwrap_or(0);
                if self.submit_suspend(tab_id.clone()).is_some() {
                    freed_bytes_estimate += estimate;
                    suspended_tab_ids.push(tab_id);
                }
            }
        }

        Ok(MemoryReport {
            suspended_tab_ids,
            restoration_triggers,
            freed_bytes_estimate,
        })
    }

    /// Façade: schedule caller-described background work.
    pub fn background_processing(&self, descriptor: &TaskDescriptor) -> VeloResult<ProcessingReceipt> {
        let (task_id, priority) = match descriptor.kind.as_str() {
            task_kinds::PREFETCH => {
                let url = required_target(descriptor)?;
                (self.submit_prefetch(url), TaskPriority::Medium)
            }
            task_kinds::SUSPEND_TAB => {
                let tab_id = required_target(descriptor)?;
                let task_id = self.submit_suspend(tab_id).ok_or_else(|| TaskError::ExecutionFailed {
                    reason: "tab is not eligible for suspension".into(),
                })?;
                (task_id, TaskPriority::High)
            }
            task_kinds::RESTORE_TAB => {
                let tab_id = required_target(descriptor)?;
                let task_id = self.submit_restore(tab_id).ok_or_else(|| TaskError::ExecutionFailed {
                    reason: "tab is not suspended".into(),
                })?;
                (task_id, TaskPriority::High)
            }
            task_kinds::CACHE_SWEEP => (self.submit_sweep(), TaskPriority::Low),
            other => {
                return Err(TaskError::UnsupportedKind {
                    kind: other.to_string(),
                }
                .into())
            }
        };

        Ok(ProcessingReceipt {
            task_id,
            priority,
            estimated_completion: self.estimate_completion(),
        })
    }

    /// Façade: current snapshot, recommendations, and task summary.
    ///
    /// If the monitor is unavailable the report carries the conservative
    /// Medium assumption instead of failing.
    pub fn performance_monitoring(&self, session_id: &str) -> VeloResult<MonitoringReport> {
        self.sessions.ensure(session_id);
        let resource_snapshot = match self.monitor.sample() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%error, "monitor unavailable; assuming medium pressure");
                ResourceSnapshot::assumed_medium(Utc::now())
            }
        };
        let cache_stats = self.cache().stats();
        let active_task_summary = self.scheduler.summary();
        let recommendations =
            recommendations::generate(&resource_snapshot, &cache_stats, &active_task_summary);
        Ok(MonitoringReport {
            resource_snapshot,
            recommendations,
            active_task_summary,
        })
    }

    /// Restore a prior snapshot. Missing files mean a cold start.
    pub fn warm_start(&self, dir: &Path) -> VeloResult<(usize, usize)> {
        let mut cache = self.cache();
        let mut tabs = self.tabs();
        persistence::load(dir, &mut cache, &mut tabs)
    }

    /// Persist the cache and tab table for the next warm start.
    pub fn save_snapshot(&self, dir: &Path) -> VeloResult<()> {
        let cache = self.cache();
        let tabs = self.tabs();
        persistence::save(dir, &cache, &tabs)
    }

    pub fn scheduler(&self) -> &BackgroundTaskScheduler {
        &self.scheduler
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Cloned view of a tab record, for the shell and for tests.
    pub fn tab(&self, tab_id: &str) -> Option<TabRecord> {
        self.tabs().get(tab_id).cloned()
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// React to a (debounced) pressure-level change.
    fn on_pressure_change(&self, snapshot: ResourceSnapshot) {
        info!(
            level = ?snapshot.pressure_level,
            memory = snapshot.memory_used_pct,
            cpu = snapshot.cpu_used_pct,
            stale = snapshot.stale,
            "pressure level changed"
        );
        if !snapshot.pressure_level.is_elevated() {
            return;
        }
        let candidates = self
            .tabs()
            .evaluate_suspension_candidates(snapshot.pressure_level);
        let top_k = self.suspension_top_k(&snapshot);
        for tab_id in candidates.into_iter().take(top_k) {
            self.submit_suspend(tab_id);
        }
    }

    /// K scales with how far the worst utilization sits over the High bar.
    fn suspension_top_k(&self, snapshot: &ResourceSnapshot) -> usize {
        let worst = snapshot.memory_used_pct.max(snapshot.cpu_used_pct);
        let overshoot = (worst - HIGH_PRESSURE_PCT).max(0.0);
        self.config.suspension.base_top_k + (overshoot / 5.0) as usize
    }

    fn submit_prefetch(&self, url: String) -> Uuid {
        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let url_for_body = url.clone();
        let spec = TaskSpec::new(
            TaskDescriptor::with_target(task_kinds::PREFETCH, url.clone()),
            TaskPriority::Medium,
            Box::new(move |token| -> TaskFuture {
                let fetcher = Arc::clone(&fetcher);
                let cache = Arc::clone(&cache);
                let url = url_for_body.clone();
                Box::pin(async move {
                    if token.is_cancelled() {
                        return Err(TaskError::ExecutionFailed {
                            reason: "cancelled before fetch".into(),
                        }
                        .into());
                    }
                    let bytes = fetcher.fetch(&url)?;
                    lock(&cache).mark_fetched(&url, Some(bytes));
                    debug!(%url, bytes, "prefetch completed");
                    Ok(())
                })
            }),
        );
        let handle = self.scheduler.submit(spec);
        let task_id = handle.task_id;

        // Only a terminal failure evicts the pending entry; individual
        // attempt failures are the scheduler's retry business.
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            if let Some(completion) = handle.completion().await {
                if completion.state == TaskState::Failed {
                    lock(&cache).mark_fetch_failed(&url);
                }
            }
        });
        task_id
    }

    fn submit_suspend(&self, tab_id: String) -> Option<Uuid> {
        // Re-check eligibility at submission time; the candidate list may
        // have gone stale.
        {
            let tabs = self.tabs();
            match tabs.get(&tab_id) {
                Some(record)
                    if record.state == TabState::Active
                        && !record.is_pinned
                        && !record.is_active => {}
                _ => {
                    debug!(%tab_id, "suspension candidate no longer eligible");
                    return None;
                }
            }
        }

        let host = Arc::clone(&self.tab_host);
        let tabs = Arc::clone(&self.tabs);
        let tab_for_body = tab_id.clone();
        let spec = TaskSpec::new(
            TaskDescriptor::with_target(task_kinds::SUSPEND_TAB, tab_id),
            TaskPriority::High,
            Box::new(move |token| -> TaskFuture {
                let host = Arc::clone(&host);
                let tabs = Arc::clone(&tabs);
                let tab_id = tab_for_body.clone();
                Box::pin(async move {
                    if token.is_cancelled() {
                        return Err(TaskError::ExecutionFailed {
                            reason: "cancelled before suspend".into(),
                        }
                        .into());
                    }
                    let freed = host.suspend_tab(&tab_id)?;
                    match lock(&tabs).mark_suspended(&tab_id) {
                        Ok(()) => debug!(%tab_id, freed_bytes = freed, "tab suspended"),
                        // The tab saw interaction while the host call ran;
                        // the next restore trigger undoes the suspend.
                        Err(error) => warn!(%tab_id, %error, "suspension superseded"),
                    }
                    Ok(())
                })
            }),
        );
        Some(self.scheduler.submit(spec).task_id)
    }

    fn submit_restore(&self, tab_id: String) -> Option<Uuid> {
        // Suspended -> Restoring happens at trigger time, so the UI can
        // show the tab as coming back immediately.
        if let Err(error) = self.tabs().mark_restoring(&tab_id) {
            debug!(%tab_id, %error, "restore trigger ignored");
            return None;
        }

        let host = Arc::clone(&self.tab_host);
        let tabs = Arc::clone(&self.tabs);
        let tab_for_body = tab_id.clone();
        let spec = TaskSpec::new(
            TaskDescriptor::with_target(task_kinds::RESTORE_TAB, tab_id),
            TaskPriority::High,
            Box::new(move |token| -> TaskFuture {
                let host = Arc::clone(&host);
                let tabs = Arc::clone(&tabs);
                let tab_id = tab_for_body.clone();
                Box::pin(async move {
                    if token.is_cancelled() {
                        return Err(TaskError::ExecutionFailed {
                            reason: "cancelled before restore".into(),
                        }
                        .into());
                    }
                    // A retry attempt finds the tab back in Suspended (the
                    // previous failure downgraded it); re-enter Restoring.
                    {
                        let mut tabs = lock(&tabs);
                        match tabs.get(&tab_id).map(|record| record.state) {
                            Some(TabState::Restoring) => {}
                            Some(TabState::Suspended) => tabs.mark_restoring(&tab_id)?,
                            Some(TabState::Active) | None => return Ok(()),
                        }
                    }
                    match host.restore_tab(&tab_id) {
                        Ok(()) => {
                            lock(&tabs).mark_active(&tab_id)?;
                            debug!(%tab_id, "tab restored");
                            Ok(())
                        }
                        Err(error) => {
                            // The tab stays suspended, flagged for a
                            // user-visible reload.
                            if let Err(flag_error) = lock(&tabs).mark_restore_failed(&tab_id) {
                                warn!(%tab_id, %flag_error, "could not flag failed restore");
                            }
                            warn!(%tab_id, %error, "restore failed");
                            Err(error)
                        }
                    }
                })
            }),
        );
        Some(self.scheduler.submit(spec).task_id)
    }

    fn submit_sweep(&self) -> Uuid {
        let cache = Arc::clone(&self.cache);
        let spec = TaskSpec::new(
            TaskDescriptor::new(task_kinds::CACHE_SWEEP),
            TaskPriority::Low,
            Box::new(move |_token| -> TaskFuture {
                let cache = Arc::clone(&cache);
                Box::pin(async move {
                    let removed = lock(&cache).evict_expired();
                    debug!(removed, "scheduled cache sweep");
                    Ok(())
                })
            }),
        )
        .with_max_attempts(1);
        self.scheduler.submit(spec).task_id
    }

    /// Rough completion estimate: queue depth over concurrency, times the
    /// per-task duration budget.
    fn estimate_completion(&self) -> chrono::DateTime<Utc> {
        let summary = self.scheduler.summary();
        let concurrency = self.scheduler.concurrency() as u64;
        let per_task_ms = self.config.scheduler.default_max_duration_ms;
        let waves = 1 + summary.queued as u64 / concurrency.max(1);
        Utc::now() + chrono::Duration::milliseconds((per_task_ms * waves) as i64)
    }

    fn cache(&self) -> MutexGuard<'_, PredictiveCache> {
        lock(&self.cache)
    }

    fn tabs(&self) -> MutexGuard<'_, TabResourceManager> {
        lock(&self.tabs)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn required_target(descriptor: &TaskDescriptor) -> VeloResult<String> {
    descriptor.target.clone().ok_or_else(|| {
        TaskError::ExecutionFailed {
            reason: format!("task kind {} requires a target", descriptor.kind),
        }
        .into()
    })
}
