use crate::errors::VeloResult;
use crate::models::{NavigationContext, PredictedNavigation};

/// Ranks candidate next-navigation URLs.
///
/// Deliberately opaque: implementations may be keyword rules, a local
/// model, or a remote call. The cache and tab subsystems never see past
/// this seam, so implementations are interchangeable.
pub trait INavigationPredictor: Send + Sync {
    /// Rank likely next navigations, highest probability first.
    fn predict(
        &self,
        current_url: &str,
        context: &NavigationContext,
    ) -> VeloResult<Vec<PredictedNavigation>>;

    /// Implementation name, surfaced in façade reports.
    fn name(&self) -> &str;
}
