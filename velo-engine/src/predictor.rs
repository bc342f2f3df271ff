//! Reference rule-based navigation predictor.
//!
//! Interchangeable with model-backed implementations behind
//! [`INavigationPredictor`]; the cache and tab subsystems never see past
//! the trait, so swapping in a smarter predictor touches nothing else.

use regex::Regex;
use tracing::debug;
use velo_core::models::{NavigationContext, PredictedNavigation};
use velo_core::traits::INavigationPredictor;
use velo_core::VeloResult;

/// A keyword rule: link hints matching `pattern` get `probability`.
struct KeywordRule {
    pattern: Regex,
    probability: f64,
}

/// Ranks the current page's link hints with keyword rules mirroring common
/// navigation trails: pagination, documentation, checkout funnels.
pub struct KeywordPredictor {
    rules: Vec<KeywordRule>,
    base_probability: f64,
}

impl KeywordPredictor {
    pub fn new() -> Self {
        let rules = [
            (r"(?i)[?&]page=\d+", 0.85),
            (r"(?i)/(next|continue)\b", 0.8),
            (r"(?i)/(docs?|documentation|guide|tutorial)/", 0.75),
            (r"(?i)/(cart|checkout|payment)", 0.7),
            (r"(?i)/(login|signin|account)", 0.65),
        ]
        .into_iter()
        .filter_map(|(pattern, probability)| {
            Regex::new(pattern)
                .ok()
                .map(|pattern| KeywordRule { pattern, probability })
        })
        .collect();
        Self {
            rules,
            base_probability: 0.3,
        }
    }
}

impl Default for KeywordPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl INavigationPredictor for KeywordPredictor {
    fn predict(
        &self,
        current_url: &str,
        context: &NavigationContext,
    ) -> VeloResult<Vec<PredictedNavigation>> {
        let mut seen = std::collections::HashSet::new();
        let mut candidates = Vec::new();
        for hint in &context.link_hints {
            if hint == current_url || !seen.insert(hint.as_str()) {
                continue;
            }
            let mut probability = self.base_probability;
            for rule in &self.rules {
                if rule.pattern.is_match(hint) {
                    probability = probability.max(rule.probability);
                }
            }
            let hint_lower = hint.to_ascii_lowercase();
            if context
                .keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && hint_lower.contains(&keyword.to_ascii_lowercase()))
            {
                probability = (probability + 0.1).min(1.0);
            }
            // A revisit is likelier than a fresh link.
            if context.recent_urls.iter().any(|visited| visited == hint) {
                probability = (probability + 0.05).min(1.0);
            }
            candidates.push(PredictedNavigation {
                url: hint.clone(),
                probability,
            });
        }
        candidates.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        debug!(current_url, candidates = candidates.len(), "ranked navigations");
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "keyword-rules"
    }
}
