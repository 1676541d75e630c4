//! Error types for the model-store crate.
//!
//! Loading distinguishes a missing artifact from a corrupt one because the
//! engine logs them differently, even though both leave it unloaded.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting or reading a model artifact
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// No artifact at the configured path (nothing has been trained yet)
    #[error("Model artifact not found at {}", path.display())]
    NotFound { path: PathBuf },

    /// File exists but does not deserialize into a valid artifact
    ///
    /// Covers malformed JSON as well as artifacts whose vectors or genre
    /// indices disagree with the stored layout.
    #[error("Model artifact at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// I/O error while reading or writing the artifact file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the artifact failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Vector layout cannot hold the genre encoding without overlapping
    /// the watch slot
    #[error("Invalid vector layout: {0}")]
    InvalidLayout(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ArtifactError>;
