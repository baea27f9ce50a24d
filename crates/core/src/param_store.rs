use crate::params::{CalibrationParameterSet, ParameterFile};
use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the active parameter generation.
///
/// Readers take an `Arc` snapshot, so a prediction in flight keeps the
/// generation it started with even if a new one is published meanwhile.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    tx: Arc<watch::Sender<Arc<CalibrationParameterSet>>>,
}

impl ParameterStore {
    /// Creates a store with an initial generation.
    #[must_use]
    pub fn new(initial: CalibrationParameterSet) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the active generation.
    #[must_use]
    pub fn current(&self) -> Arc<CalibrationParameterSet> {
        self.tx.borrow().clone()
    }

    /// Replaces the active generation wholesale.
    pub fn publish(&self, params: CalibrationParameterSet) {
        let id = params.id;
        self.tx.send_replace(Arc::new(params));
        tracing::info!(id = %id, "Published calibration parameters");
    }

    /// Receiver notified on every publish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<CalibrationParameterSet>> {
        self.tx.subscribe()
    }
}

/// Reloads a parameter file on modification and publishes it.
pub struct ParameterWatcher {
    store: ParameterStore,
    path: PathBuf,
}

impl ParameterWatcher {
    #[must_use]
    pub fn new(store: ParameterStore, path: impl AsRef<Path>) -> Self {
        Self {
            store,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads the file once and publishes it if it parses.
    ///
    /// Returns true when a new generation was published. A file whose id
    /// matches the active generation is not republished. A file that fails
    /// to load is logged and the active generation stays in place.
    pub fn reload(&self) -> bool {
        match ParameterFile::read(&self.path) {
            Ok(params) if params.id == self.store.current().id => false,
            Ok(params) => {
                self.store.publish(params);
                true
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to reload calibration parameters, keeping previous generation"
                );
                false
            }
        }
    }

    /// True when the event touches the watched file.
    fn concerns_file(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == self.path.file_name())
    }

    /// Watches the file for changes until the task is dropped.
    ///
    /// The parent directory is watched rather than the file itself: saves
    /// replace the file by rename, which would leave a watch on the old
    /// inode blind to every later write.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be initiated.
    pub async fn watch(self) -> Result<()> {
        let (notify_tx, mut notify_rx) = tokio::sync::mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = notify_tx.send(event);
            }
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        while let Some(event) = notify_rx.recv().await {
            if self.concerns_file(&event) {
                tracing::debug!(path = %self.path.display(), "Parameter file changed, reloading");
                self.reload();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterRepository, WeightSet};
    use std::time::Duration;

    #[test]
    fn snapshot_survives_publish() {
        let store = ParameterStore::new(CalibrationParameterSet::default());
        let before = store.current();

        let next = CalibrationParameterSet {
            min_edge: 0.07,
            ..CalibrationParameterSet::default()
        };
        store.publish(next.clone());

        assert_ne!(before.id, next.id);
        assert_eq!(store.current().id, next.id);
        assert!((before.min_edge - 0.02).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn subscribers_see_new_generation() {
        let store = ParameterStore::new(CalibrationParameterSet::default());
        let mut rx = store.subscribe();
        let next = CalibrationParameterSet::default();
        let id = next.id;
        store.publish(next);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().id, id);
    }

    #[test]
    fn reload_publishes_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = CalibrationParameterSet {
            weights: WeightSet::new().with("weather", 1.3),
            ..CalibrationParameterSet::default()
        };
        ParameterFile::new(&path).save(&params).unwrap();

        let store = ParameterStore::new(CalibrationParameterSet::default());
        let watcher = ParameterWatcher::new(store.clone(), &path);
        assert!(watcher.reload());
        assert_eq!(*store.current(), params);
    }

    #[test]
    fn reload_keeps_previous_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "garbage").unwrap();

        let initial = CalibrationParameterSet::default();
        let id = initial.id;
        let store = ParameterStore::new(initial);
        let watcher = ParameterWatcher::new(store.clone(), &path);
        assert!(!watcher.reload());
        assert_eq!(store.current().id, id);
    }

    #[test]
    fn reload_skips_unchanged_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        ParameterFile::new(&path)
            .save(&CalibrationParameterSet::default())
            .unwrap();

        let store = ParameterStore::new(CalibrationParameterSet::default());
        let mut rx = store.subscribe();
        let watcher = ParameterWatcher::new(store.clone(), &path);
        assert!(watcher.reload());
        rx.borrow_and_update();
        assert!(!watcher.reload());
        assert!(!rx.has_changed().unwrap());
    }

    // ============================================
    // File Watching
    // ============================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watcher_follows_repeated_atomic_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let file = ParameterFile::new(&path);
        file.save(&CalibrationParameterSet::default()).unwrap();

        let store = ParameterStore::new(CalibrationParameterSet::default());
        let mut rx = store.subscribe();
        let task = tokio::spawn(ParameterWatcher::new(store.clone(), &path).watch());
        tokio::time::sleep(Duration::from_millis(250)).await;

        for min_edge in [0.03, 0.04, 0.05] {
            let next = CalibrationParameterSet {
                min_edge,
                ..CalibrationParameterSet::default()
            };
            let id = next.id;
            file.save(&next).unwrap();

            tokio::time::timeout(Duration::from_secs(5), async {
                while store.current().id != id {
                    rx.changed().await.unwrap();
                }
            })
            .await
            .unwrap_or_else(|_| panic!("save with min_edge {min_edge} was never picked up"));
            assert!((store.current().min_edge - min_edge).abs() < f64::EPSILON);
        }

        task.abort();
    }
}
