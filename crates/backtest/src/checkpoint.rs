//! Resumable search state.
//!
//! Written after every chunk of combinations. A checkpoint only resumes a
//! search over the same dataset and grid run with the same backtest and
//! sizing settings; anything else starts fresh.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use progno_core::PersistenceError;
use serde::{Deserialize, Serialize};

use crate::ranking::Leaderboard;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub dataset_fingerprint: String,
    pub grid_fingerprint: String,
    /// Backtest and sizing settings the ranking was produced under. Missing
    /// from older files, which then never match.
    #[serde(default)]
    pub settings_fingerprint: String,
    /// First grid index not yet evaluated.
    pub next_index: usize,
    pub evaluated: usize,
    pub rejected: usize,
    pub by_roi: Leaderboard,
    pub by_sharpe: Leaderboard,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// True if this checkpoint was taken over the same dataset and grid
    /// under the same settings.
    #[must_use]
    pub fn matches(&self, dataset_fingerprint: &str, grid_fingerprint: &str, settings_fingerprint: &str) -> bool {
        self.dataset_fingerprint == dataset_fingerprint
            && self.grid_fingerprint == grid_fingerprint
            && self.settings_fingerprint == settings_fingerprint
    }
}

/// JSON checkpoint file, replaced atomically on each save.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the checkpoint via a temp file and rename.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] on IO or serialization failure.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(checkpoint)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Reads the checkpoint, or `None` if there is no file.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<Checkpoint>, PersistenceError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankBy;

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            dataset_fingerprint: "abc".into(),
            grid_fingerprint: "def".into(),
            settings_fingerprint: "ghi".into(),
            next_index: 40,
            evaluated: 40,
            rejected: 12,
            by_roi: Leaderboard::new(RankBy::Roi, 5),
            by_sharpe: Leaderboard::new(RankBy::Sharpe, 5),
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::new(dir.path().join("nested/search.ckpt.json"));
        file.save(&checkpoint()).unwrap();
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.next_index, 40);
        assert!(loaded.matches("abc", "def", "ghi"));
        assert!(!loaded.matches("abc", "xyz", "ghi"));
        assert!(!loaded.matches("abc", "def", "xyz"));
    }

    #[test]
    fn file_without_settings_never_matches() {
        let mut value = serde_json::to_value(checkpoint()).unwrap();
        value.as_object_mut().unwrap().remove("settings_fingerprint");
        let old: Checkpoint = serde_json::from_value(value).unwrap();
        assert!(!old.matches("abc", "def", "ghi"));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = CheckpointFile::new(dir.path().join("none.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            CheckpointFile::new(&path).load(),
            Err(PersistenceError::Json(_))
        ));
    }
}
