//! # velo-engine
//!
//! [`PerformanceOptimizationCoordinator`] wires the resource monitor, the
//! predictive cache, the tab manager, and the background scheduler into
//! the four façade operations the browser shell calls.

pub mod coordinator;
pub mod persistence;
pub mod predictor;
pub mod recommendations;
pub mod reports;
pub mod session;
pub mod tracing_setup;

pub use coordinator::{task_kinds, PerformanceOptimizationCoordinator};
pub use predictor::KeywordPredictor;
pub use recommendations::{Recommendation, Severity};
pub use reports::{CachingReport, MemoryReport, MonitoringReport, ProcessingReceipt};
pub use session::{SessionContext, SessionManager};
