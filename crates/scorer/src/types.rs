//! Request and response types for the recommendation engine.

use chrono::{DateTime, Utc};
use model_store::ContentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Caller-supplied preferences for one request.
///
/// Mirrors the JSON the request layer forwards:
/// `{"genres": [...], "watchHistory": [{"contentId": "...", ...}]}`.
/// Missing keys deserialize as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub genres: Vec<String>,
    pub watch_history: Vec<WatchedItem>,
}

/// One entry of the watch history; fields other than `contentId` are kept
/// but not used for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedItem {
    pub content_id: ContentId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WatchedItem {
    pub fn new(content_id: impl Into<ContentId>) -> Self {
        Self {
            content_id: content_id.into(),
            extra: Map::new(),
        }
    }
}

impl UserPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add preferred genres (builder pattern)
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres.extend(genres.into_iter().map(Into::into));
        self
    }

    /// Add watched content ids (builder pattern)
    pub fn with_watched<I, S>(mut self, content_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ContentId>,
    {
        self.watch_history
            .extend(content_ids.into_iter().map(WatchedItem::new));
        self
    }

    /// Distinct watched content ids
    pub fn watched_ids(&self) -> HashSet<&str> {
        self.watch_history
            .iter()
            .map(|item| item.content_id.as_str())
            .collect()
    }
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationSource {
    MlModel,
    RuleBased,
    Error,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RecommendationSource::MlModel => "ml-model",
            RecommendationSource::RuleBased => "rule-based",
            RecommendationSource::Error => "error",
        };
        f.write_str(tag)
    }
}

/// Ranked content ids with the source that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub content_ids: Vec<ContentId>,
    pub source: RecommendationSource,
    /// In [0, 1]
    pub confidence: f32,
}

impl RecommendationResult {
    pub fn new(content_ids: Vec<ContentId>, source: RecommendationSource, confidence: f32) -> Self {
        Self {
            content_ids,
            source,
            confidence,
        }
    }
}

/// Read-only view of the engine's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_loaded: bool,
    pub model_path: String,
    pub has_content_features: bool,
    pub num_content_items: usize,
    pub model_type: String,
    /// Time of the query, not of the artifact; see `artifact_created_at`
    pub last_updated: DateTime<Utc>,
    pub model_version: Option<String>,
    pub artifact_created_at: Option<DateTime<Utc>>,
}
