//! Training data sources.
//!
//! The trainer only sees `ContentRecord`s through the `TrainingSource`
//! trait. `SyntheticCatalog` generates them randomly; a source backed by
//! real content and usage data plugs in the same way.

use crate::error::TrainingError;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The fixed genre catalog synthetic items draw from
pub const GENRE_CATALOG: [&str; 10] = [
    "Action",
    "Comedy",
    "Drama",
    "Sci-Fi",
    "Horror",
    "Romance",
    "Thriller",
    "Fantasy",
    "Mystery",
    "Adventure",
];

/// Default number of synthetic items per training run
pub const DEFAULT_ITEM_COUNT: usize = 100;

/// One content item as seen by training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_id: String,
    pub genres: Vec<String>,
    /// In [0, 1)
    pub popularity: f32,
    /// In [6, 10)
    pub rating: f32,
}

/// Source of training records.
///
/// `Send + Sync` so a trainer holding one can be shared across tasks.
pub trait TrainingSource: Send + Sync {
    /// Name of this source (for logging)
    fn name(&self) -> &str;

    /// Produce the records for one training run
    fn fetch(&self) -> Result<Vec<ContentRecord>, TrainingError>;
}

/// Random catalog standing in for a real ingestion pipeline.
///
/// With a seed every `fetch` returns the same records; without one each
/// call draws fresh randomness from the OS.
#[derive(Debug, Clone)]
pub struct SyntheticCatalog {
    item_count: usize,
    seed: Option<u64>,
}

impl SyntheticCatalog {
    pub fn new() -> Self {
        Self {
            item_count: DEFAULT_ITEM_COUNT,
            seed: None,
        }
    }

    /// Configure the number of generated items (default: 100)
    pub fn with_item_count(mut self, item_count: usize) -> Self {
        self.item_count = item_count;
        self
    }

    /// Make generation reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn generate(&self, rng: &mut StdRng) -> Vec<ContentRecord> {
        (0..self.item_count)
            .map(|i| {
                let genre_count = rng.random_range(1..=3);
                let genres = GENRE_CATALOG
                    .choose_multiple(rng, genre_count)
                    .map(|g| g.to_string())
                    .collect();

                ContentRecord {
                    content_id: format!("content_{}", i),
                    genres,
                    popularity: rng.random::<f32>(),
                    rating: rng.random_range(6.0..10.0),
                }
            })
            .collect()
    }
}

impl Default for SyntheticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingSource for SyntheticCatalog {
    fn name(&self) -> &str {
        "SyntheticCatalog"
    }

    fn fetch(&self) -> Result<Vec<ContentRecord>, TrainingError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let records = self.generate(&mut rng);
        debug!("Generated {} synthetic content records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synthetic_catalog_shape() {
        let records = SyntheticCatalog::new().fetch().unwrap();
        assert_eq!(records.len(), 100);

        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.content_id, format!("content_{}", i));
            assert!((1..=3).contains(&record.genres.len()));
            assert!((0.0..1.0).contains(&record.popularity));
            assert!((6.0..10.0).contains(&record.rating));

            // Drawn without replacement from the catalog
            let distinct: HashSet<&String> = record.genres.iter().collect();
            assert_eq!(distinct.len(), record.genres.len());
            for genre in &record.genres {
                assert!(GENRE_CATALOG.contains(&genre.as_str()));
            }
        }
    }

    #[test]
    fn test_seeded_catalog_is_reproducible() {
        let catalog = SyntheticCatalog::new().with_seed(7);
        assert_eq!(catalog.fetch().unwrap(), catalog.fetch().unwrap());

        let other = SyntheticCatalog::new().with_seed(7);
        assert_eq!(catalog.fetch().unwrap(), other.fetch().unwrap());
    }

    #[test]
    fn test_item_count() {
        let records = SyntheticCatalog::new().with_item_count(5).fetch().unwrap();
        assert_eq!(records.len(), 5);

        let none = SyntheticCatalog::new().with_item_count(0).fetch().unwrap();
        assert!(none.is_empty());
    }
}
