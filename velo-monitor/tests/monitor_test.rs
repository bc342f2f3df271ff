use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use velo_core::config::MonitorConfig;
use velo_core::models::PressureLevel;
use velo_monitor::{IResourceSampler, ResourceMonitor, UtilizationReading};

/// Scripted sampler: pops one scheduled reading per call, then repeats the
/// last script entry forever.
struct ScriptedSampler {
    script: VecDeque<Option<UtilizationReading>>,
    last: Option<Option<UtilizationReading>>,
}

impl ScriptedSampler {
    fn new(script: Vec<Option<UtilizationReading>>) -> Self {
        Self {
            script: script.into(),
            last: None,
        }
    }
}

impl IResourceSampler for ScriptedSampler {
    fn sample(&mut self) -> Option<UtilizationReading> {
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        self.last.flatten()
    }
}

fn reading(memory: f64, cpu: f64) -> Option<UtilizationReading> {
    Some(UtilizationReading {
        memory_used_pct: memory,
        cpu_used_pct: cpu,
    })
}

fn monitor_with(script: Vec<Option<UtilizationReading>>, config: MonitorConfig) -> ResourceMonitor {
    ResourceMonitor::new(Box::new(ScriptedSampler::new(script)), config)
}

#[test]
fn classifies_pressure_from_worst_reading() {
    let monitor = monitor_with(vec![reading(50.0, 90.0)], MonitorConfig::default());
    let snapshot = monitor.sample().unwrap();
    assert_eq!(snapshot.pressure_level, PressureLevel::High);
    assert!(!snapshot.stale);
}

#[test]
fn failed_read_reserves_last_snapshot_as_stale() {
    let monitor = monitor_with(vec![reading(50.0, 50.0), None], MonitorConfig::default());
    let fresh = monitor.sample().unwrap();
    let stale = monitor.sample().unwrap();
    assert!(stale.stale);
    assert_eq!(stale.memory_used_pct, fresh.memory_used_pct);
    assert_eq!(stale.timestamp, fresh.timestamp);
}

#[test]
fn three_consecutive_failures_raise_unavailable() {
    let monitor = monitor_with(
        vec![reading(50.0, 50.0), None, None, None],
        MonitorConfig::default(),
    );
    monitor.sample().unwrap();
    assert!(monitor.sample().unwrap().stale);
    assert!(monitor.sample().unwrap().stale);
    let error = monitor.sample().unwrap_err();
    assert!(error.to_string().contains("monitor unavailable"));
}

#[test]
fn failure_with_no_prior_sample_is_an_error() {
    let monitor = monitor_with(vec![None], MonitorConfig::default());
    assert!(monitor.sample().is_err());
}

#[test]
fn successful_read_resets_the_failure_counter() {
    let monitor = monitor_with(
        vec![reading(50.0, 50.0), None, None, reading(60.0, 10.0), None, None],
        MonitorConfig::default(),
    );
    monitor.sample().unwrap();
    monitor.sample().unwrap();
    monitor.sample().unwrap();
    // Recovery: the counter starts over.
    let recovered = monitor.sample().unwrap();
    assert!(!recovered.stale);
    assert!(monitor.sample().unwrap().stale);
    assert!(monitor.sample().unwrap().stale);
}

#[tokio::test(start_paused = true)]
async fn subscription_fires_only_on_level_changes() {
    // Levels per tick: Low, Low, High, High, High -> two callbacks.
    let monitor = monitor_with(
        vec![
            reading(10.0, 10.0),
            reading(20.0, 10.0),
            reading(90.0, 10.0),
            reading(91.0, 10.0),
            reading(92.0, 10.0),
        ],
        MonitorConfig {
            sample_interval_secs: 5,
            debounce_hold_secs: 0,
            ..MonitorConfig::default()
        },
    );

    let seen: Arc<Mutex<Vec<PressureLevel>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_callback = Arc::clone(&seen);
    let handle = monitor.subscribe(move |snapshot| {
        seen_for_callback.lock().unwrap().push(snapshot.pressure_level);
    });

    tokio::time::sleep(Duration::from_secs(26)).await;
    handle.stop();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![PressureLevel::Low, PressureLevel::High]
    );
}

#[tokio::test(start_paused = true)]
async fn subscription_debounces_downward_flapping() {
    // High, then a one-tick dip to Low inside the hold window, then High
    // again: the dip never reaches the callback.
    let monitor = monitor_with(
        vec![
            reading(90.0, 10.0),
            reading(10.0, 10.0),
            reading(90.0, 10.0),
        ],
        MonitorConfig {
            sample_interval_secs: 5,
            debounce_hold_secs: 60,
            ..MonitorConfig::default()
        },
    );

    let seen: Arc<Mutex<Vec<PressureLevel>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_callback = Arc::clone(&seen);
    let handle = monitor.subscribe(move |snapshot| {
        seen_for_callback.lock().unwrap().push(snapshot.pressure_level);
    });

    tokio::time::sleep(Duration::from_secs(16)).await;
    handle.stop();

    assert_eq!(*seen.lock().unwrap(), vec![PressureLevel::High]);
}

#[tokio::test(start_paused = true)]
async fn subscription_degrades_to_medium_when_unavailable() {
    // One good Low sample, then permanent failure: after the monitor gives
    // up, subscribers see the conservative Medium assumption.
    let monitor = monitor_with(
        vec![reading(10.0, 10.0), None],
        MonitorConfig {
            sample_interval_secs: 5,
            debounce_hold_secs: 0,
            max_consecutive_failures: 3,
            ..MonitorConfig::default()
        },
    );

    let seen: Arc<Mutex<Vec<(PressureLevel, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_callback = Arc::clone(&seen);
    let handle = monitor.subscribe(move |snapshot| {
        seen_for_callback
            .lock()
            .unwrap()
            .push((snapshot.pressure_level, snapshot.stale));
    });

    tokio::time::sleep(Duration::from_secs(31)).await;
    handle.stop();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], (PressureLevel::Low, false));
    assert!(seen.contains(&(PressureLevel::Medium, true)));
}
