//! # Recommendation Engine
//!
//! Two states: **Unloaded** (initial) and **Loaded**.
//!
//! - Loaded: rank every unwatched item by cosine similarity to the user
//!   vector and return the top `limit` tagged `ml-model`.
//! - Unloaded: return an empty `rule-based` result.
//! - Scoring failure: log it and return an empty `error` result.
//!
//! ## Concurrency
//! The current model is an immutable `Arc<ModelArtifact>` behind a `RwLock`.
//! Requests hold the read lock only to clone the `Arc` and score against
//! that snapshot. A reload validates the new artifact completely before
//! replacing the pointer in one write, so a request sees either the old
//! model or the new one.

use crate::config::ConfidencePolicy;
use crate::error::ScoringError;
use crate::similarity::cosine_similarity;
use crate::types::{ModelInfo, RecommendationResult, RecommendationSource, UserPreferences};
use crate::user_vector::build_user_vector;
use chrono::Utc;
use model_store::{ArtifactError, ContentId, MODEL_TYPE, ModelArtifact};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Serves recommendations from the current model artifact
pub struct RecommendationEngine {
    model_path: PathBuf,
    confidence: ConfidencePolicy,
    current: RwLock<Option<Arc<ModelArtifact>>>,
}

impl RecommendationEngine {
    /// Create an unloaded engine reading its model from `model_path`
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            confidence: ConfidencePolicy::default(),
            current: RwLock::new(None),
        }
    }

    /// Override the confidence values (default: 0.85 / 0.6 / 0.0)
    pub fn with_confidence(mut self, confidence: ConfidencePolicy) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Current model, if any. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Option<Arc<ModelArtifact>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, next: Option<Arc<ModelArtifact>>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Read the artifact from disk and make it current.
    ///
    /// On any failure the engine goes back to Unloaded, exactly as if it had
    /// never loaded a model, and the error is returned for the caller to log.
    #[instrument(skip(self), fields(path = %self.model_path.display()))]
    pub fn load_model(&self) -> Result<(), ArtifactError> {
        match ModelArtifact::load_from_file(&self.model_path) {
            Ok(artifact) => {
                info!(
                    "Model {} v{} loaded ({} items, {} genres)",
                    artifact.model,
                    artifact.version,
                    artifact.num_content_items(),
                    artifact.num_genres()
                );
                self.replace(Some(Arc::new(artifact)));
                Ok(())
            }
            Err(e) => {
                match &e {
                    ArtifactError::NotFound { .. } => warn!("{}", e),
                    _ => error!("Error loading model: {}", e),
                }
                self.replace(None);
                Err(e)
            }
        }
    }

    /// Make an in-memory artifact current after validating it
    pub fn install(&self, artifact: ModelArtifact) -> Result<(), ArtifactError> {
        artifact.validate()?;
        debug!(
            "Installing model {} v{} ({} items)",
            artifact.model,
            artifact.version,
            artifact.num_content_items()
        );
        self.replace(Some(Arc::new(artifact)));
        Ok(())
    }

    /// Get recommendations for one request. Never fails.
    #[instrument(skip(self, preferences))]
    pub fn recommend(
        &self,
        user_id: &str,
        profile_id: &str,
        preferences: &UserPreferences,
        limit: usize,
    ) -> RecommendationResult {
        let Some(model) = self.snapshot() else {
            debug!("No model loaded, returning rule-based fallback");
            return self.result(Vec::new(), RecommendationSource::RuleBased);
        };

        let start = Instant::now();
        match rank_unwatched(&model, preferences, limit) {
            Ok(content_ids) => {
                debug!(
                    "Ranked {} recommendations in {:.2?}",
                    content_ids.len(),
                    start.elapsed()
                );
                self.result(content_ids, RecommendationSource::MlModel)
            }
            Err(e) => {
                error!("Error in ML-based recommendations: {}", e);
                self.result(Vec::new(), RecommendationSource::Error)
            }
        }
    }

    fn result(&self, content_ids: Vec<ContentId>, source: RecommendationSource) -> RecommendationResult {
        RecommendationResult::new(content_ids, source, self.confidence.for_source(source))
    }

    /// Introspection. `last_updated` is the time of this call.
    pub fn model_info(&self) -> ModelInfo {
        let model = self.snapshot();
        ModelInfo {
            model_loaded: model.is_some(),
            model_path: self.model_path.display().to_string(),
            has_content_features: model.is_some(),
            num_content_items: model.as_ref().map_or(0, |m| m.num_content_items()),
            model_type: MODEL_TYPE.to_string(),
            last_updated: Utc::now(),
            model_version: model.as_ref().map(|m| m.version.clone()),
            artifact_created_at: model.as_ref().map(|m| m.created_at),
        }
    }
}

/// Rank every unwatched item in `model` against the user's vector.
///
/// Sorted by similarity descending; equal similarities keep ascending
/// content-id order.
pub fn rank_unwatched(
    model: &ModelArtifact,
    preferences: &UserPreferences,
    limit: usize,
) -> Result<Vec<ContentId>, ScoringError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let watched = preferences.watched_ids();
    let user_vector = build_user_vector(
        preferences.genres.as_slice(),
        watched.len(),
        &model.genre_encoding,
        &model.layout,
    );

    let mut scored: Vec<(&ContentId, f32)> = model
        .content_features
        .par_iter()
        .filter(|(content_id, _)| !watched.contains(content_id.as_str()))
        .map(|(content_id, vector)| {
            let similarity = cosine_similarity(&user_vector, vector)?;
            if !similarity.is_finite() {
                return Err(ScoringError::NonFinite {
                    content_id: content_id.clone(),
                });
            }
            Ok((content_id, similarity))
        })
        .collect::<Result<_, ScoringError>>()?;

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(content_id, _)| content_id.clone())
        .collect())
}
