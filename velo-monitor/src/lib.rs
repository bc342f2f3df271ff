//! # velo-monitor
//!
//! Samples system memory/CPU utilization, classifies it into a pressure
//! level, and notifies subscribers only when the (debounced) level
//! actually changes, so downstream consumers are never thrashed.

pub mod monitor;
pub mod sampler;

pub use monitor::{MonitorHandle, ResourceMonitor};
pub use sampler::{IResourceSampler, ProcfsSampler, UtilizationReading};
