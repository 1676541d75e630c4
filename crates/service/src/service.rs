//! # Recommendation Service
//!
//! Wires the trainer and the recommendation engine together:
//! 1. Connect the experiment tracker (or fall back to no tracking)
//! 2. Load whatever artifact is already on disk
//! 3. Serve recommendations from the engine
//! 4. Train, then reload the engine from the fresh artifact
//!
//! Blocking file work runs inside `spawn_blocking`.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use model_store::TrainingMetrics;
use scorer::{ModelInfo, RecommendationEngine, RecommendationResult, UserPreferences};
use trainer::{ExperimentTracker, MlflowTracker, NoopTracker, SyntheticCatalog, Trainer};

use crate::config::ServiceConfig;

/// Name reported by the health check
pub const SERVICE_NAME: &str = "ml-service";

/// Result of a train-then-reload cycle
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub status: String,
    pub message: String,
    pub metrics: TrainingMetrics,
    /// Whether the engine picked up the new artifact
    pub model_reloaded: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub model_loaded: bool,
}

/// Acknowledgement for a logged feedback event
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackAck {
    pub status: String,
    pub message: String,
}

/// Owns the engine and the trainer for one model path
#[derive(Clone)]
pub struct RecommendationService {
    engine: Arc<RecommendationEngine>,
    trainer: Arc<Trainer>,
}

impl RecommendationService {
    /// Assemble a service from already-built parts. Does not load anything.
    pub fn new(engine: RecommendationEngine, trainer: Trainer) -> Self {
        Self {
            engine: Arc::new(engine),
            trainer: Arc::new(trainer),
        }
    }

    /// Build the service from configuration and load the current artifact.
    ///
    /// A missing or unreadable artifact is not fatal: the engine starts
    /// Unloaded and serves rule-based fallbacks until the next training run.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.model_dir).with_context(|| {
            format!("Failed to create model directory {}", config.model_dir.display())
        })?;

        let trainer_config = config.trainer_config()?;
        let model_path = trainer_config.model_path.clone();

        let mut source = SyntheticCatalog::new().with_item_count(config.synthetic_items);
        if let Some(seed) = config.synthetic_seed {
            source = source.with_seed(seed);
        }

        let trainer = Trainer::new(trainer_config)
            .with_source(source)
            .with_tracker(connect_tracker(config).await);

        let service = Self::new(RecommendationEngine::new(model_path), trainer);
        if !service.reload_model().await {
            info!("Will use fallback recommendations until model is trained");
        }
        Ok(service)
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Reload the engine from disk. Returns whether a model is now loaded.
    pub async fn reload_model(&self) -> bool {
        let engine = self.engine.clone();
        match tokio::task::spawn_blocking(move || engine.load_model()).await {
            Ok(Ok(())) => true,
            // Already logged by the engine
            Ok(Err(_)) => false,
            Err(e) => {
                warn!("Model load task failed: {}", e);
                false
            }
        }
    }

    /// Score one request against the current model
    pub fn recommend(
        &self,
        user_id: &str,
        profile_id: &str,
        preferences: &UserPreferences,
        limit: usize,
    ) -> RecommendationResult {
        self.engine.recommend(user_id, profile_id, preferences, limit)
    }

    /// Train a new artifact, then reload the engine from it
    #[instrument(skip(self))]
    pub async fn train(&self, force_retrain: bool) -> Result<TrainingReport> {
        info!("Starting model training...");

        let metrics = self
            .trainer
            .train(force_retrain)
            .await
            .context("Error training model")?;

        let model_reloaded = self.reload_model().await;
        if !model_reloaded {
            warn!("Trained artifact could not be loaded; engine is serving fallbacks");
        }

        info!("Model training completed successfully");
        Ok(TrainingReport {
            status: "success".to_string(),
            message: "Model trained successfully".to_string(),
            metrics,
            model_reloaded,
            timestamp: Utc::now(),
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        self.engine.model_info()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now(),
            model_loaded: self.engine.is_loaded(),
        }
    }

    /// Record a rating. Feedback is logged only, nothing is stored.
    pub fn log_feedback(&self, user_id: &str, content_id: &str, rating: f32) -> Result<FeedbackAck> {
        if !rating.is_finite() {
            anyhow::bail!("Rating must be a finite number, got {}", rating);
        }
        info!(
            "Received feedback: user={}, content={}, rating={}",
            user_id, content_id, rating
        );
        Ok(FeedbackAck {
            status: "success".to_string(),
            message: "Feedback logged successfully".to_string(),
        })
    }
}

/// MLflow when enabled and reachable, otherwise no tracking
async fn connect_tracker(config: &ServiceConfig) -> Arc<dyn ExperimentTracker> {
    if !config.tracking_enabled {
        info!("Experiment tracking disabled");
        return Arc::new(NoopTracker);
    }

    match MlflowTracker::connect(&config.mlflow_tracking_uri, &config.mlflow_experiment).await {
        Ok(tracker) => Arc::new(tracker),
        Err(e) => {
            warn!("MLflow unavailable, training without tracking: {}", e);
            Arc::new(NoopTracker)
        }
    }
}
