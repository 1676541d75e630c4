//! Confidence values attached to each kind of result.
//!
//! These are static today. Keeping them in one policy object lets a computed
//! confidence replace them without touching callers.

use crate::types::RecommendationSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Results ranked by a loaded model
    pub ml_model: f32,
    /// Fallback results while no model is loaded
    pub rule_based: f32,
    /// Empty results returned after a scoring failure
    pub error: f32,
}

impl ConfidencePolicy {
    pub fn with_ml_model(mut self, confidence: f32) -> Self {
        self.ml_model = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_rule_based(mut self, confidence: f32) -> Self {
        self.rule_based = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_error(mut self, confidence: f32) -> Self {
        self.error = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn for_source(&self, source: RecommendationSource) -> f32 {
        match source {
            RecommendationSource::MlModel => self.ml_model,
            RecommendationSource::RuleBased => self.rule_based,
            RecommendationSource::Error => self.error,
        }
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            ml_model: 0.85,
            rule_based: 0.6,
            error: 0.0,
        }
    }
}
