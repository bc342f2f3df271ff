//! Error taxonomy for the Velo engine.
//!
//! Expected outcomes — a rejected admission, a cache miss — are plain values
//! on the `Ok` path; only genuinely exceptional conditions become errors,
//! and those degrade gracefully rather than crash the coordinator.

mod cache_error;
mod config_error;
mod monitor_error;
mod tab_error;
mod task_error;

pub use cache_error::CacheError;
pub use config_error::ConfigError;
pub use monitor_error::MonitorError;
pub use tab_error::TabError;
pub use task_error::TaskError;

/// Convenience alias used across the workspace.
pub type VeloResult<T> = Result<T, VeloError>;

/// Umbrella error aggregating every subsystem.
#[derive(Debug, thiserror::Error)]
pub enum VeloError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Tab(#[from] TabError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
