//! Integration tests for the recommendation engine.
//!
//! These write real artifact files and drive the engine through its load
//! and recommend cycle.

use chrono::Utc;
use model_store::{GenreEncoding, ModelArtifact, VectorLayout};
use scorer::{
    build_user_vector, cosine_similarity, RecommendationEngine, RecommendationSource,
    UserPreferences,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::thread;

const GENRES: [&str; 10] = [
    "Action", "Adventure", "Comedy", "Drama", "Fantasy", "Horror", "Mystery", "Romance",
    "Sci-Fi", "Thriller",
];

/// Deterministic artifact with `items` content vectors in [0, 1)
fn build_artifact(items: usize, version: &str) -> ModelArtifact {
    let layout = VectorLayout::default();
    let content_features = (0..items)
        .map(|i| {
            let vector = (0..layout.length)
                .map(|d| ((i * 31 + d * 17 + 7) % 97) as f32 / 97.0)
                .collect();
            (format!("content_{}", i), vector)
        })
        .collect::<BTreeMap<_, _>>();

    ModelArtifact {
        model: "collaborative_filtering_v1".to_string(),
        content_features,
        genre_encoding: GenreEncoding::from_genres(GENRES),
        layout,
        version: version.to_string(),
        created_at: Utc::now(),
    }
}

fn write_artifact(path: &Path, items: usize, version: &str) -> ModelArtifact {
    let artifact = build_artifact(items, version);
    artifact.save_to_file(path).unwrap();
    artifact
}

#[test]
fn test_loaded_engine_ranks_unwatched_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");
    let artifact = write_artifact(&path, 100, "1.0.0");

    let engine = RecommendationEngine::new(&path);
    engine.load_model().unwrap();
    assert!(engine.is_loaded());

    let prefs = UserPreferences::new()
        .with_genres(["Action", "Sci-Fi"])
        .with_watched(["content_1", "content_2", "content_3"]);
    let result = engine.recommend("user-1", "profile-1", &prefs, 20);

    assert_eq!(result.source, RecommendationSource::MlModel);
    assert_eq!(result.confidence, 0.85);
    assert_eq!(result.content_ids.len(), 20);
    for watched in ["content_1", "content_2", "content_3"] {
        assert!(!result.content_ids.contains(&watched.to_string()));
    }

    // Non-increasing similarity to the user's vector
    let user_vector = build_user_vector(
        prefs.genres.as_slice(),
        3,
        &artifact.genre_encoding,
        &artifact.layout,
    );
    let similarities: Vec<f32> = result
        .content_ids
        .iter()
        .map(|id| cosine_similarity(&user_vector, &artifact.content_features[id]).unwrap())
        .collect();
    assert!(similarities.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_result_length_is_bounded_by_unwatched_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");
    write_artifact(&path, 10, "1.0.0");

    let engine = RecommendationEngine::new(&path);
    engine.load_model().unwrap();

    // Two catalog items plus one id the catalog has never seen
    let prefs = UserPreferences::new()
        .with_genres(["Drama"])
        .with_watched(["content_0", "content_5", "content_999"]);

    let small = engine.recommend("u", "p", &prefs, 4);
    assert_eq!(small.content_ids.len(), 4);

    let large = engine.recommend("u", "p", &prefs, 50);
    assert_eq!(large.content_ids.len(), 8);
}

#[test]
fn test_unknown_genre_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");
    write_artifact(&path, 10, "1.0.0");

    let engine = RecommendationEngine::new(&path);
    engine.load_model().unwrap();

    let known = UserPreferences::new().with_genres(["Horror"]);
    let with_unknown = UserPreferences::new().with_genres(["Horror", "Telenovela"]);

    let a = engine.recommend("u", "p", &known, 5);
    let b = engine.recommend("u", "p", &with_unknown, 5);
    assert_eq!(b.source, RecommendationSource::MlModel);
    assert_eq!(a.content_ids, b.content_ids);
}

#[test]
fn test_unloaded_engine_always_returns_rule_based() {
    let engine = RecommendationEngine::new("does/not/exist.json");

    let requests = [
        UserPreferences::new(),
        UserPreferences::new().with_genres(["Action"]),
        UserPreferences::new().with_watched(["content_1"]),
    ];
    for prefs in &requests {
        let result = engine.recommend("u", "p", prefs, 20);
        assert_eq!(result.source, RecommendationSource::RuleBased);
        assert!(result.content_ids.is_empty());
        assert_eq!(result.confidence, 0.6);
    }
}

#[test]
fn test_load_missing_matches_fresh_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");

    let fresh = RecommendationEngine::new(&path);
    let engine = RecommendationEngine::new(&path);
    assert!(engine.load_model().is_err());

    let (a, b) = (fresh.model_info(), engine.model_info());
    assert_eq!(a.model_loaded, b.model_loaded);
    assert_eq!(a.has_content_features, b.has_content_features);
    assert_eq!(a.num_content_items, b.num_content_items);
    assert_eq!(a.model_version, b.model_version);
    assert!(!engine.is_loaded());
}

#[test]
fn test_failed_reload_drops_previous_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");
    write_artifact(&path, 10, "1.0.0");

    let engine = RecommendationEngine::new(&path);
    engine.load_model().unwrap();
    assert!(engine.is_loaded());

    std::fs::write(&path, b"{ truncated").unwrap();
    assert!(engine.load_model().is_err());
    assert!(!engine.is_loaded());

    let result = engine.recommend("u", "p", &UserPreferences::new(), 5);
    assert_eq!(result.source, RecommendationSource::RuleBased);
}

#[test]
fn test_reload_picks_up_new_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recommendation_model.json");
    write_artifact(&path, 10, "1.0.0");

    let engine = RecommendationEngine::new(&path);
    engine.load_model().unwrap();
    assert_eq!(engine.model_info().num_content_items, 10);

    write_artifact(&path, 25, "1.1.0");
    engine.load_model().unwrap();

    let info = engine.model_info();
    assert!(info.model_loaded);
    assert!(info.has_content_features);
    assert_eq!(info.num_content_items, 25);
    assert_eq!(info.model_version.as_deref(), Some("1.1.0"));
}

#[test]
fn test_requests_see_whole_snapshots_during_reload() {
    let dir = tempfile::tempdir().unwrap();
    let small_path = dir.path().join("small.json");
    let large_path = dir.path().join("large.json");
    write_artifact(&small_path, 20, "1.0.0");
    write_artifact(&large_path, 30, "2.0.0");

    let engine = RecommendationEngine::new(&small_path);
    engine.load_model().unwrap();
    let prefs = UserPreferences::new().with_genres(["Comedy"]);

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..50 {
                let artifact = if i % 2 == 0 {
                    build_artifact(30, "2.0.0")
                } else {
                    build_artifact(20, "1.0.0")
                };
                engine.install(artifact).unwrap();
            }
        });

        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let result = engine.recommend("u", "p", &prefs, 100);
                    assert_eq!(result.source, RecommendationSource::MlModel);
                    let len = result.content_ids.len();
                    assert!(len == 20 || len == 30, "mixed snapshot: {} items", len);
                }
            });
        }
    });
}
