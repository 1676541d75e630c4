//! Error types for training and experiment tracking.

use model_store::ArtifactError;
use thiserror::Error;

/// Errors that abort a training run.
///
/// Tracking problems never show up here: they are logged and skipped.
#[derive(Error, Debug)]
pub enum TrainingError {
    /// The training data source could not produce records
    #[error("Training source failed: {0}")]
    Source(String),

    /// Building or persisting the artifact failed
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Errors from the experiment-tracking collaborator
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Tracking service could not be reached at startup
    #[error("Tracking service at {uri} is unreachable: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Tracking call {endpoint} rejected with status {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Reading the artifact file for upload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from tracking service: {0}")]
    InvalidResponse(String),
}

impl TrackingError {
    /// The service did not answer at all, as opposed to answering badly
    pub fn is_transport(&self) -> bool {
        match self {
            TrackingError::Unreachable { .. } => true,
            TrackingError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
