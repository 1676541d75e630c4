//! Errors raised while scoring a request.
//!
//! These never leave the engine: `recommend` turns them into an empty result
//! tagged `error`.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ScoringError {
    /// Two vectors in one similarity computation differ in length
    #[error("Vector dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Similarity came out as NaN or infinite
    #[error("Non-finite similarity for content {content_id}")]
    NonFinite { content_id: String },
}
