//! Loading each data source once per process.
//!
//! Entries are keyed by the canonical path of the source, and remember the size and modification
//! time of the file they were loaded from. If either changes, the next request loads the file
//! again.
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use qu::ick_use::*;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use crate::{DataSourceError, Dataset, Result};

static GLOBAL: Lazy<DatasetCache> = Lazy::new(DatasetCache::new);

/// Load the dataset at `path` through the process-wide cache.
pub fn load_cached(path: impl AsRef<Path>) -> Result<Arc<Dataset>> {
    GLOBAL.get_or_load(path)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self, DataSourceError> {
        let meta = fs::metadata(path).map_err(|source| DataSourceError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Fingerprint {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Entry {
    fingerprint: Fingerprint,
    /// Filled by whichever caller gets there first. Other callers block until it's done.
    dataset: Arc<OnceCell<Arc<Dataset>>>,
}

/// Normalized datasets, each loaded once.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalized dataset at `path`, loading it if this is the first request or the file
    /// has changed since it was loaded.
    ///
    /// Concurrent first requests for the same file share one load. Failed loads aren't
    /// remembered, so the next request tries again.
    pub fn get_or_load(&self, path: impl AsRef<Path>) -> Result<Arc<Dataset>> {
        let path = path.as_ref();
        let key = fs::canonicalize(path).map_err(|source| DataSourceError::Io {
            path: path.to_owned(),
            source,
        })?;
        let fingerprint = Fingerprint::of(&key)?;

        let cell = {
            let mut entries = self.entries.lock();
            let current = entries
                .get(&key)
                .filter(|entry| entry.fingerprint == fingerprint)
                .map(|entry| entry.dataset.clone());
            match current {
                Some(cell) => cell,
                None => {
                    if entries.contains_key(&key) {
                        event!(
                            Level::INFO,
                            "\"{}\" has changed since it was loaded",
                            key.display()
                        );
                    }
                    let cell = Arc::new(OnceCell::new());
                    entries.insert(
                        key.clone(),
                        Entry {
                            fingerprint,
                            dataset: cell.clone(),
                        },
                    );
                    cell
                }
            }
        };

        // loading happens outside the lock
        if let Some(dataset) = cell.get() {
            event!(Level::DEBUG, "cache hit for \"{}\"", key.display());
            return Ok(dataset.clone());
        }
        let dataset = cell.get_or_try_init(|| Dataset::load(&key).map(Arc::new))?;
        Ok(dataset.clone())
    }

    /// Forget the dataset loaded from `path`, if any.
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_owned());
        self.entries.lock().remove(&key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of sources with an entry, loaded or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
