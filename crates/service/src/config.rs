//! Environment configuration for the service.
//!
//! Every key has a default, so an empty environment gives a working setup:
//! models under `models/`, tracking against a local MLflow server.

use anyhow::{Context, Result};
use model_store::{DEFAULT_VECTOR_LENGTH, VectorLayout, WatchSlot};
use serde::Deserialize;
use std::path::PathBuf;
use trainer::{DEFAULT_EXPERIMENT, DEFAULT_TRACKING_URI, TrainerConfig};

/// Service configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// MLflow tracking server
    #[serde(default = "default_tracking_uri")]
    pub mlflow_tracking_uri: String,

    /// MLflow experiment name
    #[serde(default = "default_experiment")]
    pub mlflow_experiment: String,

    #[serde(default = "default_tracking_enabled")]
    pub tracking_enabled: bool,

    /// Directory holding the artifact, created on startup
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Items generated per training run
    #[serde(default = "default_synthetic_items")]
    pub synthetic_items: usize,

    /// Fixes the synthetic catalog and embeddings when set
    #[serde(default)]
    pub synthetic_seed: Option<u64>,

    /// Reserved watch-history slot: an index or `last`
    #[serde(default = "default_watch_slot")]
    pub watch_slot: String,

    #[serde(default = "default_vector_length")]
    pub vector_length: usize,
}

fn default_tracking_uri() -> String {
    DEFAULT_TRACKING_URI.to_string()
}

fn default_experiment() -> String {
    DEFAULT_EXPERIMENT.to_string()
}

fn default_tracking_enabled() -> bool {
    true
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_model_file() -> String {
    "recommendation_model.json".to_string()
}

fn default_synthetic_items() -> usize {
    100
}

fn default_watch_slot() -> String {
    WatchSlot::default().to_string()
}

fn default_vector_length() -> usize {
    DEFAULT_VECTOR_LENGTH
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mlflow_tracking_uri: default_tracking_uri(),
            mlflow_experiment: default_experiment(),
            tracking_enabled: default_tracking_enabled(),
            model_dir: default_model_dir(),
            model_file: default_model_file(),
            synthetic_items: default_synthetic_items(),
            synthetic_seed: None,
            watch_slot: default_watch_slot(),
            vector_length: default_vector_length(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<ServiceConfig>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, ServiceConfig>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    /// Vector layout from `VECTOR_LENGTH` and `WATCH_SLOT`
    pub fn layout(&self) -> Result<VectorLayout> {
        let watch_slot: WatchSlot = self
            .watch_slot
            .parse()
            .context("Invalid WATCH_SLOT")?;
        Ok(VectorLayout::new(self.vector_length, watch_slot))
    }

    pub fn trainer_config(&self) -> Result<TrainerConfig> {
        Ok(TrainerConfig {
            model_path: self.model_path(),
            layout: self.layout()?,
            seed: self.synthetic_seed,
            ..TrainerConfig::default()
        })
    }
}
