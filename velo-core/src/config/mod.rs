//! Engine configuration: one sub-config per subsystem, TOML-loadable,
//! every field defaulted so a missing file or partial file still works.

pub mod defaults;

mod cache_config;
mod monitor_config;
mod scheduler_config;
mod suspension_config;

pub use cache_config::CacheConfig;
pub use monitor_config::MonitorConfig;
pub use scheduler_config::SchedulerConfig;
pub use suspension_config::SuspensionConfig;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, VeloResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeloConfig {
    pub cache: CacheConfig,
    pub suspension: SuspensionConfig,
    pub scheduler: SchedulerConfig,
    pub monitor: MonitorConfig,
}

impl VeloConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> VeloResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}
