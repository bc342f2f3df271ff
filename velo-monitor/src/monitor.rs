//! Pressure monitoring with stale fallback and change-only notification.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};
use velo_core::config::MonitorConfig;
use velo_core::errors::MonitorError;
use velo_core::models::{PressureLevel, ResourceSnapshot};
use velo_core::VeloResult;

use crate::sampler::IResourceSampler;

struct MonitorState {
    sampler: Box<dyn IResourceSampler>,
    last_snapshot: Option<ResourceSnapshot>,
    consecutive_failures: u32,
}

/// Samples utilization and classifies pressure.
///
/// Cheap to clone; clones share the same sampler state, so the
/// subscription loop and façade callers see one consistent view.
#[derive(Clone)]
pub struct ResourceMonitor {
    inner: Arc<Mutex<MonitorState>>,
    config: MonitorConfig,
}

impl ResourceMonitor {
    pub fn new(sampler: Box<dyn IResourceSampler>, config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorState {
                sampler,
                last_snapshot: None,
                consecutive_failures: 0,
            })),
            config,
        }
    }

    /// Take a sample, classifying pressure by fixed thresholds.
    ///
    /// A failed read re-serves the last-known snapshot flagged `stale`;
    /// after `max_consecutive_failures` consecutive failures this returns
    /// [`MonitorError::Unavailable`] and dependents fall back to assuming
    /// Medium pressure rather than blocking.
    pub fn sample(&self) -> VeloResult<ResourceSnapshot> {
        self.sample_at(Utc::now())
    }

    pub fn sample_at(&self, now: DateTime<Utc>) -> VeloResult<ResourceSnapshot> {
        let mut state = self.state();
        match state.sampler.sample() {
            Some(reading) => {
                let snapshot =
                    ResourceSnapshot::new(now, reading.memory_used_pct, reading.cpu_used_pct);
                state.consecutive_failures = 0;
                state.last_snapshot = Some(snapshot);
                Ok(snapshot)
            }
            None => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.max_consecutive_failures {
                    warn!(
                        failures = state.consecutive_failures,
                        "resource monitor unavailable"
                    );
                    return Err(MonitorError::Unavailable {
                        consecutive_failures: state.consecutive_failures,
                    }
                    .into());
                }
                match state.last_snapshot {
                    Some(last) => Ok(last.as_stale()),
                    None => Err(MonitorError::SampleFailed {
                        reason: "no prior sample to re-serve".into(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Spawn the sampling loop. `callback` fires only when the debounced
    /// pressure level changes; while the monitor is unavailable the loop
    /// degrades to delivering the conservative Medium assumption.
    ///
    /// Requires a tokio runtime. The loop stops when the returned handle
    /// is dropped.
    pub fn subscribe<F>(&self, callback: F) -> MonitorHandle
    where
        F: Fn(ResourceSnapshot) + Send + Sync + 'static,
    {
        let monitor = self.clone();
        let interval = Duration::from_secs(self.config.sample_interval_secs.max(1));
        let hold = Duration::from_secs(self.config.debounce_hold_secs);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut debouncer = LevelDebouncer::new(hold, Instant::now());
            let mut last_delivered: Option<PressureLevel> = None;
            loop {
                ticker.tick().await;
                let snapshot = match monitor.sample() {
                    Ok(snapshot) => snapshot,
                    Err(error) => {
                        debug!(%error, "sample failed; assuming medium pressure");
                        ResourceSnapshot::assumed_medium(Utc::now())
                    }
                };
                let level = debouncer.filter(snapshot.pressure_level, Instant::now());
                if last_delivered != Some(level) {
                    last_delivered = Some(level);
                    let mut delivered = snapshot;
                    delivered.pressure_level = level;
                    callback(delivered);
                }
            }
        });
        MonitorHandle { join }
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stops the sampling loop on drop (or explicitly via [`stop`](Self::stop)).
#[derive(Debug)]
pub struct MonitorHandle {
    join: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.join.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Suppresses downward flapping: level increases pass immediately
/// (escalations must not be delayed), decreases only once the higher
/// level has held for the hold window.
struct LevelDebouncer {
    current: PressureLevel,
    last_change: Instant,
    hold: Duration,
}

impl LevelDebouncer {
    fn new(hold: Duration, now: Instant) -> Self {
        Self {
            current: PressureLevel::Low,
            last_change: now,
            hold,
        }
    }

    fn filter(&mut self, next: PressureLevel, now: Instant) -> PressureLevel {
        if next > self.current {
            self.current = next;
            self.last_change = now;
            return next;
        }
        if next < self.current && now.duration_since(self.last_change) < self.hold {
            return self.current;
        }
        if next != self.current {
            self.current = next;
            self.last_change = now;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debouncer_passes_increases_immediately() {
        let start = Instant::now();
        let mut debouncer = LevelDebouncer::new(Duration::from_secs(10), start);
        assert_eq!(
            debouncer.filter(PressureLevel::Critical, start),
            PressureLevel::Critical
        );
    }

    #[test]
    fn debouncer_holds_decreases_within_window() {
        let start = Instant::now();
        let mut debouncer = LevelDebouncer::new(Duration::from_secs(10), start);
        debouncer.filter(PressureLevel::High, start);

        // Still inside the hold window: the drop is suppressed.
        let early = start + Duration::from_secs(5);
        assert_eq!(debouncer.filter(PressureLevel::Low, early), PressureLevel::High);

        // Past the window it goes through.
        let late = start + Duration::from_secs(11);
        assert_eq!(debouncer.filter(PressureLevel::Low, late), PressureLevel::Low);
    }

    #[test]
    fn debouncer_reescalation_resets_the_window() {
        let start = Instant::now();
        let mut debouncer = LevelDebouncer::new(Duration::from_secs(10), start);
        debouncer.filter(PressureLevel::High, start);
        debouncer.filter(PressureLevel::Critical, start + Duration::from_secs(9));
        // The window now runs from the escalation to Critical.
        let probe = start + Duration::from_secs(15);
        assert_eq!(
            debouncer.filter(PressureLevel::Medium, probe),
            PressureLevel::Critical
        );
    }
}
