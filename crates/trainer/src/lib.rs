//! # Trainer Crate
//!
//! Builds model artifacts and reports training runs.
//!
//! ## Components
//!
//! ### Training Sources
//! Anything implementing `TrainingSource` can feed the trainer. The bundled
//! `SyntheticCatalog` generates random items over a fixed 10-genre catalog.
//!
//! ### Trainer
//! Encodes genres, builds a placeholder feature vector per item, validates
//! the vector layout and writes the artifact atomically.
//!
//! ### Experiment Tracking
//! `MlflowTracker` talks to an MLflow server over REST; `NoopTracker` is used
//! when tracking is off. Tracking failures are logged and never abort a run.
//!
//! ## Example Usage
//!
//! ```ignore
//! use trainer::{SyntheticCatalog, Trainer, TrainerConfig};
//!
//! let trainer = Trainer::new(TrainerConfig::default())
//!     .with_source(SyntheticCatalog::new().with_seed(42));
//! let metrics = trainer.train(false).await?;
//! println!("trained {} items", metrics.num_content_items);
//! ```

pub mod error;
pub mod source;
pub mod tracking;
pub mod trainer;

pub use error::{TrackingError, TrainingError};
pub use source::{ContentRecord, SyntheticCatalog, TrainingSource, GENRE_CATALOG};
pub use tracking::{
    ExperimentTracker, MlflowTracker, NoopTracker, RunId, RunStatus, DEFAULT_EXPERIMENT,
    DEFAULT_TRACKING_URI,
};
pub use trainer::{Trainer, TrainerConfig, DEFAULT_MODEL_PATH};
