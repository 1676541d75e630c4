//! Reading and writing the model artifact.
//!
//! The artifact is a single JSON document. Every save writes to its own
//! uniquely named temporary file next to the target, syncs it and renames it
//! over the target. Readers never observe a half-written model, concurrent
//! saves never share a temporary file, and a failed save leaves the previous
//! artifact in place.

use crate::error::{ArtifactError, Result};
use crate::types::ModelArtifact;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

impl ModelArtifact {
    /// Load and validate an artifact from `path`.
    ///
    /// A missing file is `NotFound`; anything that fails to deserialize or
    /// validate is `Corrupt`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArtifactError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ArtifactError::Io(e),
        })?;

        let corrupt = |reason: String| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        artifact.validate().map_err(|e| corrupt(e.to_string()))?;

        debug!(
            "Read artifact {} v{} ({} items) from {}",
            artifact.model,
            artifact.version,
            artifact.num_content_items(),
            path.display()
        );
        Ok(artifact)
    }

    /// Atomically persist the artifact to `path`, creating parent
    /// directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // Removed on drop unless persisted
        let mut temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| ArtifactError::Io(e.error))?;

        info!(
            "Saved artifact {} v{} ({} items) to {}",
            self.model,
            self.version,
            self.num_content_items(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenreEncoding, VectorLayout, WatchSlot};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_artifact(version: &str) -> ModelArtifact {
        let layout = VectorLayout::new(8, WatchSlot::Fixed(4));
        let mut content_features = BTreeMap::new();
        content_features.insert("content_0".to_string(), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        content_features.insert("content_1".to_string(), vec![0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1]);

        ModelArtifact {
            model: "collaborative_filtering_v1".to_string(),
            content_features,
            genre_encoding: GenreEncoding::from_genres(["Action", "Drama"]),
            layout,
            version: version.to_string(),
            created_at: Utc::now(),
        }
    }

    fn large_artifact(version: &str, items: usize) -> ModelArtifact {
        let mut artifact = sample_artifact(version);
        artifact.content_features = (0..items)
            .map(|i| {
                let vector = (0..8).map(|d| ((i + d) % 10) as f32 / 10.0).collect();
                (format!("content_{}", i), vector)
            })
            .collect();
        artifact
    }

    fn entries_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_save_then_load_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("recommendation_model.json");

        let artifact = sample_artifact("1.0.0");
        artifact.save_to_file(&path).unwrap();

        let loaded = ModelArtifact::load_from_file(&path).unwrap();
        assert_eq!(loaded, artifact);
        assert_eq!(entries_in(path.parent().unwrap()), vec!["recommendation_model.json"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing_here.json");

        let err = ModelArtifact::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.json");
        fs::write(&path, b"definitely not json").unwrap();

        let err = ModelArtifact::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }

    #[test]
    fn test_load_inconsistent_layout_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.json");

        let mut artifact = sample_artifact("1.0.0");
        artifact.layout = VectorLayout::new(8, WatchSlot::Fixed(1));
        fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

        let err = ModelArtifact::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }

    #[test]
    fn test_save_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.json");

        sample_artifact("1.0.0").save_to_file(&path).unwrap();
        sample_artifact("1.0.1").save_to_file(&path).unwrap();

        let loaded = ModelArtifact::load_from_file(&path).unwrap();
        assert_eq!(loaded.version, "1.0.1");
    }

    #[test]
    fn test_failed_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the target makes the final rename fail
        let path = dir.path().join("recommendation_model.json");
        fs::create_dir(&path).unwrap();

        assert!(sample_artifact("2.0.0").save_to_file(&path).is_err());
        assert!(path.is_dir());
        assert_eq!(entries_in(dir.path()), vec!["recommendation_model.json"]);
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.json");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let err = ModelArtifact::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }

    #[test]
    fn test_concurrent_saves_leave_loadable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.json");
        let first = large_artifact("1.0.0", 2000);
        let second = large_artifact("2.0.0", 2000);

        for _ in 0..10 {
            std::thread::scope(|scope| {
                let a = scope.spawn(|| first.save_to_file(&path));
                let b = scope.spawn(|| second.save_to_file(&path));
                a.join().unwrap().unwrap();
                b.join().unwrap().unwrap();
            });

            let loaded = ModelArtifact::load_from_file(&path).unwrap();
            assert!(loaded == first || loaded == second);
        }
        assert_eq!(entries_in(dir.path()), vec!["recommendation_model.json"]);
    }
}
