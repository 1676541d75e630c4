//! Model training: records in, persisted artifact out.
//!
//! ## Algorithm
//! 1. Fetch records from the configured `TrainingSource`
//! 2. Encode the sorted set of genres to indices
//! 3. Check that the encoding fits below the watch slot
//! 4. Give every item a random feature vector (placeholder embedding)
//! 5. Persist the artifact atomically
//! 6. Report params, metrics and the artifact file to the tracker
//!
//! Steps 1-5 decide success. Step 6 is observability only.

use crate::error::{TrackingError, TrainingError};
use crate::source::{ContentRecord, SyntheticCatalog, TrainingSource};
use crate::tracking::{ExperimentTracker, NoopTracker, RunId, RunStatus};
use chrono::{DateTime, Utc};
use model_store::{
    ContentId, FeatureVector, GenreEncoding, MODEL_TYPE, ModelArtifact, TrainingMetrics,
    VectorLayout,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Default artifact location
pub const DEFAULT_MODEL_PATH: &str = "models/recommendation_model.json";

/// Settings for a trainer
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Where the artifact is written
    pub model_path: PathBuf,
    pub layout: VectorLayout,
    /// Identifier stored in the artifact
    pub model_tag: String,
    /// Semantic version stored in the artifact
    pub version: String,
    /// Seed for the placeholder embeddings; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            layout: VectorLayout::default(),
            model_tag: "collaborative_filtering_v1".to_string(),
            version: "1.0.0".to_string(),
            seed: None,
        }
    }
}

/// Builds, persists and reports model artifacts
pub struct Trainer {
    config: TrainerConfig,
    source: Arc<dyn TrainingSource>,
    tracker: Arc<dyn ExperimentTracker>,
    /// One training run at a time per trainer
    run_lock: Mutex<()>,
}

impl Trainer {
    /// Trainer over the default synthetic catalog with tracking disabled
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            source: Arc::new(SyntheticCatalog::new()),
            tracker: Arc::new(NoopTracker),
            run_lock: Mutex::new(()),
        }
    }

    /// Replace the training data source
    pub fn with_source(mut self, source: impl TrainingSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Replace the experiment tracker
    pub fn with_tracker(mut self, tracker: Arc<dyn ExperimentTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.config.model_path
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run one full training cycle.
    ///
    /// `force_retrain` is recorded but does not gate anything: every call
    /// produces a fresh artifact. Concurrent calls queue behind each other.
    #[instrument(skip(self), fields(source = self.source.name(), tracker = self.tracker.name()))]
    pub async fn train(&self, force_retrain: bool) -> Result<TrainingMetrics, TrainingError> {
        let _guard = self.run_lock.lock().await;
        info!("Starting model training (force_retrain={})", force_retrain);
        let started_at = Utc::now();

        let records = self.source.fetch()?;
        let mut run = self.start_tracked_run(started_at, records.len()).await;

        let artifact = match self.build_artifact(&records, started_at) {
            Ok(artifact) => artifact,
            Err(e) => {
                self.finish_tracked_run(run.as_mut(), RunStatus::Failed).await;
                return Err(e);
            }
        };
        let metrics = TrainingMetrics::from_artifact(&artifact);

        if let Err(e) = self.persist(artifact).await {
            self.finish_tracked_run(run.as_mut(), RunStatus::Failed).await;
            return Err(e);
        }

        if let Some(run) = run.as_mut() {
            self.report_outputs(run, &metrics).await;
        }
        self.finish_tracked_run(run.as_mut(), RunStatus::Finished).await;

        info!(
            "Model training completed: {} items, {} genres, version {}",
            metrics.num_content_items, metrics.num_genres, metrics.model_version
        );
        Ok(metrics)
    }

    /// Assemble an artifact from records without touching storage
    pub fn build_artifact(
        &self,
        records: &[ContentRecord],
        created_at: DateTime<Utc>,
    ) -> Result<ModelArtifact, TrainingError> {
        let genre_encoding = build_genre_encoding(records);
        self.config.layout.validate(genre_encoding.len())?;

        let content_features =
            build_content_features(records, self.config.layout.length, self.config.seed);
        debug!(
            "Built {} feature vectors of length {} over {} genres",
            content_features.len(),
            self.config.layout.length,
            genre_encoding.len()
        );

        Ok(ModelArtifact {
            model: self.config.model_tag.clone(),
            content_features,
            genre_encoding,
            layout: self.config.layout,
            version: self.config.version.clone(),
            created_at,
        })
    }

    /// Write the artifact on the blocking pool
    async fn persist(&self, artifact: ModelArtifact) -> Result<(), TrainingError> {
        let path = self.config.model_path.clone();
        tokio::task::spawn_blocking(move || artifact.save_to_file(&path))
            .await
            .map_err(|e| TrainingError::Task(e.to_string()))??;
        Ok(())
    }

    async fn start_tracked_run(&self, started_at: DateTime<Utc>, num_samples: usize) -> Option<TrackedRun> {
        let run_name = format!("training_{}", started_at.format("%Y%m%d_%H%M%S"));
        let id = match self.tracker.start_run(&run_name).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not start tracking run {}: {}", run_name, e);
                return None;
            }
        };
        let mut run = TrackedRun::new(id);

        let params = [
            ("num_samples", num_samples.to_string()),
            ("model_type", MODEL_TYPE.to_string()),
            ("timestamp", started_at.to_rfc3339()),
        ];
        for (key, value) in params {
            if !run.reachable {
                break;
            }
            let result = self.tracker.log_param(&run.id, key, &value).await;
            run.record("log_param", result);
        }
        Some(run)
    }

    async fn report_outputs(&self, run: &mut TrackedRun, metrics: &TrainingMetrics) {
        let values = [
            ("num_content_items", metrics.num_content_items as f64),
            ("num_genres", metrics.num_genres as f64),
        ];
        for (key, value) in values {
            if !run.reachable {
                return;
            }
            let result = self.tracker.log_metric(&run.id, key, value).await;
            run.record("log_metric", result);
        }

        if run.reachable {
            let result = self.tracker.log_artifact(&run.id, &self.config.model_path).await;
            run.record("log_artifact", result);
        }
    }

    async fn finish_tracked_run(&self, run: Option<&mut TrackedRun>, status: RunStatus) {
        if let Some(run) = run {
            if run.reachable {
                let result = self.tracker.end_run(&run.id, status).await;
                run.record("end_run", result);
            }
        }
    }
}

/// An open tracking run. Once the service stops answering, the remaining
/// calls for the run are skipped.
struct TrackedRun {
    id: RunId,
    reachable: bool,
}

impl TrackedRun {
    fn new(id: RunId) -> Self {
        Self { id, reachable: true }
    }

    fn record(&mut self, operation: &str, result: Result<(), TrackingError>) {
        let Err(e) = result else {
            return;
        };
        if e.is_transport() {
            warn!(
                "Tracking call {} failed, skipping the rest of run {}: {}",
                operation, self.id.0, e
            );
            self.reachable = false;
        } else {
            warn!("Tracking call {} failed, continuing: {}", operation, e);
        }
    }
}

/// Sorted union of every record's genres
pub fn build_genre_encoding(records: &[ContentRecord]) -> GenreEncoding {
    GenreEncoding::from_genres(records.iter().flat_map(|r| r.genres.iter()))
}

/// Uniform-random `[0, 1)` vector per record.
///
/// Stands in for learned content embeddings.
pub fn build_content_features(
    records: &[ContentRecord],
    length: usize,
    seed: Option<u64>,
) -> BTreeMap<ContentId, FeatureVector> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    records
        .iter()
        .map(|record| {
            let vector: FeatureVector = (0..length).map(|_| rng.random::<f32>()).collect();
            (record.content_id.clone(), vector)
        })
        .collect()
}
