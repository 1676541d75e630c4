//! Recommendation scoring over a trained model artifact.
//!
//! This crate provides:
//! - `RecommendationEngine`: loads the artifact and answers requests
//! - User-vector construction from genre preferences and watch history
//! - Cosine similarity and parallel ranking of unwatched items
//! - `ConfidencePolicy` for the confidence attached to each result source
//!
//! ## Example Usage
//! ```ignore
//! use scorer::{RecommendationEngine, UserPreferences};
//!
//! let engine = RecommendationEngine::new("models/recommendation_model.json");
//! if let Err(e) = engine.load_model() {
//!     eprintln!("serving fallback results: {}", e);
//! }
//!
//! let prefs = UserPreferences::new()
//!     .with_genres(["Action", "Sci-Fi"])
//!     .with_watched(["content_3"]);
//! let result = engine.recommend("user-1", "profile-1", &prefs, 20);
//! println!("{} via {}", result.content_ids.len(), result.source);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod similarity;
pub mod types;
pub mod user_vector;

// Re-export main types
pub use config::ConfidencePolicy;
pub use engine::{rank_unwatched, RecommendationEngine};
pub use error::ScoringError;
pub use similarity::cosine_similarity;
pub use types::{ModelInfo, RecommendationResult, RecommendationSource, UserPreferences, WatchedItem};
pub use user_vector::{build_user_vector, watch_influence};
