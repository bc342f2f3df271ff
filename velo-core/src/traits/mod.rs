//! Seams to external collaborators and long-running work.

pub mod cancellation;
pub mod fetcher;
pub mod predictor;
pub mod tab_host;

pub use cancellation::{Cancellable, CancellationToken};
pub use fetcher::IPrefetchFetcher;
pub use predictor::INavigationPredictor;
pub use tab_host::ITabHost;
