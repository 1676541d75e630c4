//! # Model Store Crate
//!
//! Shared contract between training and scoring: the domain types that make
//! up a model artifact and the code that persists it.
//!
//! ## Main Components
//!
//! - **types**: `ModelArtifact`, `GenreEncoding`, `VectorLayout`, `TrainingMetrics`
//! - **artifact**: atomic save and validated load of the artifact file
//! - **error**: `ArtifactError`
//!
//! ## Example Usage
//!
//! ```ignore
//! use model_store::ModelArtifact;
//! use std::path::Path;
//!
//! let artifact = ModelArtifact::load_from_file(Path::new("models/recommendation_model.json"))?;
//! println!("{} items, {} genres", artifact.num_content_items(), artifact.num_genres());
//! ```

pub mod error;
pub mod types;
pub mod artifact;

pub use error::{ArtifactError, Result};
pub use types::{
    // Type aliases
    ContentId,
    FeatureVector,
    // Core types
    GenreEncoding,
    ModelArtifact,
    TrainingMetrics,
    VectorLayout,
    WatchSlot,
    // Constants
    DEFAULT_VECTOR_LENGTH,
    DEFAULT_WATCH_SLOT,
    MODEL_TYPE,
};
