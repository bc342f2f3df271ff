//! # velo-core
//!
//! Foundation crate for the Velo resource-management engine.
//! Defines the shared models, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::VeloConfig;
pub use errors::{VeloError, VeloResult};
pub use models::{NavigationContext, PredictedNavigation, PressureLevel, ResourceSnapshot};
