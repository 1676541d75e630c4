//! Core domain types shared by the trainer and the scorer.
//!
//! The artifact is the only contract between the two: the trainer writes
//! it, the scorer reads it and never mutates it.

use crate::error::{ArtifactError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of a content item (e.g. "content_42")
pub type ContentId = String;

/// Dense feature vector for one content item
pub type FeatureVector = Vec<f32>;

/// Default dimensionality of content and user vectors
pub const DEFAULT_VECTOR_LENGTH: usize = 100;

/// Default position of the watch-count influence slot
pub const DEFAULT_WATCH_SLOT: usize = 50;

/// Static model-type tag reported by introspection and tracking
pub const MODEL_TYPE: &str = "collaborative_filtering";

// =============================================================================
// Vector Layout
// =============================================================================

/// Where the watch-count influence slot lives inside a vector.
///
/// `Fixed(50)` reproduces the historical layout. Genre indices are assigned
/// from 0 upwards, so a fixed slot caps the number of genres at its index;
/// `Last` moves the slot to the end and leaves `length - 1` genre positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "index")]
pub enum WatchSlot {
    Fixed(usize),
    Last,
}

impl WatchSlot {
    /// Resolve the policy to a concrete index for a vector of `length`
    pub fn resolve(self, length: usize) -> usize {
        match self {
            WatchSlot::Fixed(index) => index,
            WatchSlot::Last => length.saturating_sub(1),
        }
    }
}

impl Default for WatchSlot {
    fn default() -> Self {
        WatchSlot::Fixed(DEFAULT_WATCH_SLOT)
    }
}

impl fmt::Display for WatchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSlot::Fixed(index) => write!(f, "{}", index),
            WatchSlot::Last => write!(f, "last"),
        }
    }
}

/// Parses `"last"` or a plain index, as used by configuration
impl FromStr for WatchSlot {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("last") {
            return Ok(WatchSlot::Last);
        }
        trimmed
            .parse::<usize>()
            .map(WatchSlot::Fixed)
            .map_err(|_| {
                ArtifactError::InvalidLayout(format!(
                    "watch slot must be an index or \"last\", got {:?}",
                    s
                ))
            })
    }
}

/// Dimensionality and reserved-slot policy for every vector in a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorLayout {
    pub length: usize,
    pub watch_slot: WatchSlot,
}

impl VectorLayout {
    pub fn new(length: usize, watch_slot: WatchSlot) -> Self {
        Self { length, watch_slot }
    }

    /// Concrete index of the watch-count slot
    pub fn watch_index(&self) -> usize {
        self.watch_slot.resolve(self.length)
    }

    /// Number of genre indices that fit below the watch slot
    pub fn genre_capacity(&self) -> usize {
        self.watch_index()
    }

    /// Check that the layout is usable for `genre_count` encoded genres
    pub fn validate(&self, genre_count: usize) -> Result<()> {
        if self.length == 0 {
            return Err(ArtifactError::InvalidLayout(
                "vector length must be positive".to_string(),
            ));
        }
        let watch_index = self.watch_index();
        if watch_index >= self.length {
            return Err(ArtifactError::InvalidLayout(format!(
                "watch slot {} is outside a vector of length {}",
                watch_index, self.length
            )));
        }
        if genre_count > self.genre_capacity() {
            return Err(ArtifactError::InvalidLayout(format!(
                "{} genres would collide with the watch slot at index {}",
                genre_count, watch_index
            )));
        }
        Ok(())
    }
}

impl Default for VectorLayout {
    fn default() -> Self {
        Self::new(DEFAULT_VECTOR_LENGTH, WatchSlot::default())
    }
}

// =============================================================================
// Genre Encoding
// =============================================================================

/// Genre name to vector index.
///
/// Built from the sorted set of distinct genres, so the same genre set always
/// yields the same assignment regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreEncoding(BTreeMap<String, usize>);

impl GenreEncoding {
    pub fn from_genres<I, S>(genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = genres
            .into_iter()
            .map(|g| g.as_ref().to_string())
            .collect();

        Self(
            distinct
                .into_iter()
                .enumerate()
                .map(|(idx, genre)| (genre, idx))
                .collect(),
        )
    }

    pub fn index_of(&self, genre: &str) -> Option<usize> {
        self.0.get(genre).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest assigned index, if any genre is encoded
    pub fn max_index(&self) -> Option<usize> {
        self.0.values().copied().max()
    }
}

// =============================================================================
// Model Artifact
// =============================================================================

/// Versioned bundle produced by one training run.
///
/// `content_features` is a BTreeMap so every consumer iterates content ids in
/// ascending order; ranking relies on that for its tie-break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Model identifier, e.g. "collaborative_filtering_v1"
    pub model: String,
    pub content_features: BTreeMap<ContentId, FeatureVector>,
    pub genre_encoding: GenreEncoding,
    pub layout: VectorLayout,
    /// Semantic version string
    pub version: String,
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn num_content_items(&self) -> usize {
        self.content_features.len()
    }

    pub fn num_genres(&self) -> usize {
        self.genre_encoding.len()
    }

    /// Check the internal consistency of the artifact.
    ///
    /// Every vector must match the layout length and no genre index may
    /// reach the watch slot.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate(self.genre_encoding.len())?;

        if let Some(max_index) = self.genre_encoding.max_index() {
            if max_index >= self.layout.watch_index() {
                return Err(ArtifactError::InvalidLayout(format!(
                    "genre index {} collides with the watch slot at index {}",
                    max_index,
                    self.layout.watch_index()
                )));
            }
        }

        for (content_id, vector) in &self.content_features {
            if vector.len() != self.layout.length {
                return Err(ArtifactError::InvalidLayout(format!(
                    "vector for {} has length {}, expected {}",
                    content_id,
                    vector.len(),
                    self.layout.length
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Training Metrics
// =============================================================================

/// Summary returned by a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub num_content_items: usize,
    pub num_genres: usize,
    pub model_version: String,
    /// Always "simulated": the synthetic pipeline has no meaningful duration
    pub training_time: String,
}

impl TrainingMetrics {
    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self {
            num_content_items: artifact.num_content_items(),
            num_genres: artifact.num_genres(),
            model_version: artifact.version.clone(),
            training_time: "simulated".to_string(),
        }
    }
}
