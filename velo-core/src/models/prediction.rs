use serde::{Deserialize, Serialize};

/// A candidate next navigation with its predicted likelihood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedNavigation {
    pub url: String,
    /// Likelihood of the user navigating here next, in [0, 1].
    pub probability: f64,
}

/// Signals available to a navigation predictor when ranking candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationContext {
    /// URLs visited most recently in this session, newest last.
    pub recent_urls: Vec<String>,
    /// Outgoing link targets visible on the current page.
    pub link_hints: Vec<String>,
    /// Keywords extracted from the current page or query.
    pub keywords: Vec<String>,
}
