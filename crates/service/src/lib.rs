//! Service crate for the ReelRecs recommendation core.
//!
//! Loads environment configuration and wires the trainer and the
//! recommendation engine into one `RecommendationService`.

pub mod config;
pub mod service;

pub use config::ServiceConfig;
pub use service::{FeedbackAck, HealthStatus, RecommendationService, TrainingReport, SERVICE_NAME};
