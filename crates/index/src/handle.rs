use std::sync::{Arc, Mutex, RwLock};

use crate::query::{SearchHit, SearchOptions};
use crate::store::{EmbeddingStore, StoreDir};
use crate::IndexError;

/// A store as seen by in-flight queries.
#[derive(Debug)]
pub struct Snapshot {
    pub store: Arc<EmbeddingStore>,
    /// Increments on every swap.
    pub version: u64,
    /// On-disk generation the store was loaded from, if any.
    pub generation: Option<String>,
}

/// Shared, hot-swappable embedding store.
///
/// Readers clone the current `Arc<Snapshot>` and search without holding the
/// lock. A reload builds the replacement outside the read/write lock and swaps
/// it in with one write, so a query observes either the old store or the new
/// one. Swaps are serialized: a reload holds `swap` from reading `CURRENT`
/// until its snapshot is installed, so an older generation can never replace
/// a newer one.
#[derive(Debug)]
pub struct StoreHandle {
    current: RwLock<Arc<Snapshot>>,
    swap: Mutex<()>,
    dir: Option<StoreDir>,
}

impl StoreHandle {
    /// Wrap an in-memory store. [`reload`](Self::reload) is unavailable.
    pub fn new(store: EmbeddingStore) -> Self {
        Self::with_snapshot(store, None, None)
    }

    /// Load the live generation of `dir`.
    pub fn open(dir: StoreDir) -> Result<Self, IndexError> {
        let (generation, store) = dir.load_current()?;
        Ok(Self::with_snapshot(store, Some(generation), Some(dir)))
    }

    fn with_snapshot(
        store: EmbeddingStore,
        generation: Option<String>,
        dir: Option<StoreDir>,
    ) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot {
                store: Arc::new(store),
                version: 1,
                generation,
            })),
            swap: Mutex::new(()),
            dir,
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    pub fn store(&self) -> Arc<EmbeddingStore> {
        Arc::clone(&self.snapshot().store)
    }

    pub fn search(
        &self,
        query: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, IndexError> {
        self.snapshot().store.search_with(query, options)
    }

    /// Install `store` as the current snapshot and return its version.
    pub fn replace(&self, store: EmbeddingStore, generation: Option<String>) -> u64 {
        let _swap = self.swap.lock().unwrap_or_else(|p| p.into_inner());
        self.install(store, generation).version
    }

    /// Re-read the backing directory and swap in its live generation.
    ///
    /// On failure the current snapshot keeps serving.
    pub fn reload(&self) -> Result<Arc<Snapshot>, IndexError> {
        self.reload_validated(|_| Ok(()))
    }

    /// Like [`reload`](Self::reload), but `validate` may reject the freshly
    /// loaded store before it becomes visible to readers.
    ///
    /// Concurrent reloads run one at a time; each installs the generation
    /// that was live when it started, so the last one to finish serves the
    /// newest store.
    pub fn reload_validated<F>(&self, validate: F) -> Result<Arc<Snapshot>, IndexError>
    where
        F: FnOnce(&EmbeddingStore) -> Result<(), IndexError>,
    {
        let dir = self.dir.as_ref().ok_or_else(|| IndexError::NotFound {
            path: "<in-memory store>".to_string(),
        })?;
        let _swap = self.swap.lock().unwrap_or_else(|p| p.into_inner());
        let (generation, store) = dir.load_current()?;
        validate(&store)?;
        let items = store.len();
        let snapshot = self.install(store, Some(generation));
        tracing::info!(
            generation = ?snapshot.generation,
            version = snapshot.version,
            items,
            "embedding store reloaded"
        );
        Ok(snapshot)
    }

    /// Caller holds `swap`. The version is taken under the write lock so it
    /// always grows in install order.
    fn install(&self, store: EmbeddingStore, generation: Option<String>) -> Arc<Snapshot> {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        let snapshot = Arc::new(Snapshot {
            store: Arc::new(store),
            version: guard.version + 1,
            generation,
        });
        *guard = Arc::clone(&snapshot);
        snapshot
    }

    pub fn dir(&self) -> Option<&StoreDir> {
        self.dir.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::l2_normalized;
    use std::thread;
    use tempfile::TempDir;

    fn unit(values: &[f32]) -> Vec<f32> {
        l2_normalized(values).unwrap()
    }

    #[test]
    fn reload_swaps_to_new_generation() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        store_dir.save(&[1], &[unit(&[1.0, 0.0])]).unwrap();

        let handle = StoreHandle::open(store_dir.clone()).unwrap();
        let before = handle.snapshot();
        assert_eq!(before.store.len(), 1);
        assert_eq!(before.generation.as_deref(), Some("gen-000001"));

        store_dir
            .save(&[1, 2], &[unit(&[1.0, 0.0]), unit(&[0.0, 1.0])])
            .unwrap();
        let after = handle.reload().unwrap();

        assert_eq!(after.store.len(), 2);
        assert!(after.version > before.version);
        // old snapshot is still usable by whoever holds it
        assert_eq!(before.store.len(), 1);
    }

    #[test]
    fn failed_reload_keeps_current_snapshot() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        store_dir.save(&[1], &[unit(&[1.0, 0.0])]).unwrap();
        let handle = StoreHandle::open(store_dir).unwrap();

        std::fs::write(dir.path().join("CURRENT"), "gen-000099").unwrap();
        assert!(handle.reload().is_err());
        assert_eq!(handle.snapshot().store.len(), 1);
        assert_eq!(handle.snapshot().version, 1);
    }

    #[test]
    fn rejected_reload_is_not_installed() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        store_dir.save(&[1], &[unit(&[1.0, 0.0])]).unwrap();
        let handle = StoreHandle::open(store_dir.clone()).unwrap();

        store_dir.save(&[1], &[unit(&[1.0, 0.0, 0.0])]).unwrap();
        let err = handle
            .reload_validated(|store| {
                if store.dim() == 2 {
                    Ok(())
                } else {
                    Err(IndexError::DimensionMismatch {
                        expected: 2,
                        actual: store.dim(),
                    })
                }
            })
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { actual: 3, .. }));
        assert_eq!(handle.snapshot().store.dim(), 2);
    }

    #[test]
    fn overlapping_reloads_never_roll_back() {
        use std::sync::mpsc;

        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path()).with_retain_generations(3);
        store_dir.save(&[1], &[unit(&[1.0, 0.0])]).unwrap();
        let handle = Arc::new(StoreHandle::open(store_dir.clone()).unwrap());

        let (loaded_tx, loaded_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let slow = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || {
                handle
                    .reload_validated(|store| {
                        loaded_tx.send(store.len()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(())
                    })
                    .unwrap()
            })
        };
        // the slow reload has read gen-000001 and is parked in validation
        assert_eq!(loaded_rx.recv().unwrap(), 1);

        store_dir
            .save(&[1, 2], &[unit(&[1.0, 0.0]), unit(&[0.0, 1.0])])
            .unwrap();
        let fast = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.reload().unwrap())
        };
        release_tx.send(()).unwrap();

        let slow = slow.join().unwrap();
        let fast = fast.join().unwrap();
        assert_eq!(slow.generation.as_deref(), Some("gen-000001"));
        assert_eq!(fast.generation.as_deref(), Some("gen-000002"));
        assert!(fast.version > slow.version);

        let served = handle.snapshot();
        assert_eq!(served.generation.as_deref(), Some("gen-000002"));
        assert_eq!(served.store.len(), 2);
        assert_eq!(served.version, 3);
        assert_eq!(store_dir.current_generation().unwrap(), "gen-000002");
    }

    #[test]
    fn versions_follow_install_order_under_concurrent_replace() {
        let handle = Arc::new(StoreHandle::new(EmbeddingStore::empty(2)));
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| handle.replace(EmbeddingStore::empty(2), None))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut versions: Vec<u64> = writers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        versions.sort_unstable();
        assert_eq!(versions, (2..=101).collect::<Vec<_>>());
        assert_eq!(handle.snapshot().version, 101);
    }

    #[test]
    fn in_memory_handle_cannot_reload() {
        let handle = StoreHandle::new(EmbeddingStore::empty(2));
        assert!(matches!(handle.reload(), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let a = EmbeddingStore::from_vectors(vec![1], &[unit(&[1.0, 0.0])]).unwrap();
        let handle = Arc::new(StoreHandle::new(a));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let hits = handle.search(&[1.0, 0.0], SearchOptions::top(5)).unwrap();
                        // one row or two rows, never a mix
                        assert!(hits.len() == 1 || hits.len() == 2);
                        assert_eq!(hits[0].id, 1);
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            let b = EmbeddingStore::from_vectors(
                vec![1, 2],
                &[unit(&[1.0, 0.0]), unit(&[0.0, 1.0])],
            )
            .unwrap();
            handle.replace(b, None);
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(handle.snapshot().version, 51);
    }
}
