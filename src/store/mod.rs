//! Snapshot store: the single integration point between the collector
//! (writes) and the query service (reads).
//!
//! The trait models a date-keyed durable table with upsert-by-key writes
//! and an unordered range scan. Callers must sort scan results themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use crate::error::StoreError;
use crate::model::{AggregateSnapshot, PerSourceSnapshot};

pub trait SnapshotStore: Send + Sync {
    /// Upsert one daily rollup keyed by its `date`.
    fn put_aggregate(&self, snapshot: &AggregateSnapshot) -> Result<(), StoreError>;

    /// Upsert one per-source entry keyed by its composite `id`.
    fn put_per_source(&self, snapshot: &PerSourceSnapshot) -> Result<(), StoreError>;

    /// All aggregates with `start <= date <= end` (inclusive, string
    /// comparison on YYYY-MM-DD keys). Result order is NOT guaranteed.
    fn scan_aggregates(&self, start: &str, end: &str)
        -> Result<Vec<AggregateSnapshot>, StoreError>;
}

fn in_range(date: &str, start: &str, end: &str) -> bool {
    date >= start && date <= end
}

/// In-memory store, used as the test fake and for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    aggregates: Mutex<HashMap<String, AggregateSnapshot>>,
    per_source: Mutex<HashMap<String, PerSourceSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate_count(&self) -> usize {
        self.aggregates.lock().expect("store mutex poisoned").len()
    }

    pub fn per_source_count(&self) -> usize {
        self.per_source.lock().expect("store mutex poisoned").len()
    }

    pub fn per_source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .per_source
            .lock()
            .expect("store mutex poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl SnapshotStore for MemoryStore {
    fn put_aggregate(&self, snapshot: &AggregateSnapshot) -> Result<(), StoreError> {
        let mut map = self.aggregates.lock().expect("store mutex poisoned");
        map.insert(snapshot.date.clone(), snapshot.clone());
        Ok(())
    }

    fn put_per_source(&self, snapshot: &PerSourceSnapshot) -> Result<(), StoreError> {
        let mut map = self.per_source.lock().expect("store mutex poisoned");
        map.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    fn scan_aggregates(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<AggregateSnapshot>, StoreError> {
        let map = self.aggregates.lock().expect("store mutex poisoned");
        Ok(map
            .values()
            .filter(|s| in_range(&s.date, start, end))
            .cloned()
            .collect())
    }
}

/// File-backed store: one JSON map per table under a data directory.
/// Writes are whole-file read-modify-write under a mutex, which is the
/// per-key atomicity the collector's upsert semantics rely on.
pub struct JsonFileStore {
    aggregates_path: PathBuf,
    per_source_path: PathBuf,
    // One lock for both files; collection runs touch both.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data dir {}", dir.display()))
            .map_err(StoreError::Write)?;
        Ok(Self {
            aggregates_path: dir.join("aggregates.json"),
            per_source_path: dir.join("per_source.json"),
            lock: Mutex::new(()),
        })
    }

    fn load_map<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<HashMap<String, T>, StoreError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(StoreError::Read)?;
        serde_json::from_str(&content)
            .with_context(|| format!("decoding {}", path.display()))
            .map_err(StoreError::Read)
    }

    // Write-then-rename so a crash mid-write never truncates the live
    // table; the rename is atomic within the same directory.
    fn save_map<T: serde::Serialize>(
        path: &Path,
        map: &HashMap<String, T>,
    ) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map)
            .context("encoding store table")
            .map_err(StoreError::Write)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("writing {}", tmp.display()))
            .map_err(StoreError::Write)?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("replacing {}", path.display()))
            .map_err(StoreError::Write)
    }
}

impl SnapshotStore for JsonFileStore {
    fn put_aggregate(&self, snapshot: &AggregateSnapshot) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut map: HashMap<String, AggregateSnapshot> = Self::load_map(&self.aggregates_path)?;
        map.insert(snapshot.date.clone(), snapshot.clone());
        Self::save_map(&self.aggregates_path, &map)
    }

    fn put_per_source(&self, snapshot: &PerSourceSnapshot) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut map: HashMap<String, PerSourceSnapshot> = Self::load_map(&self.per_source_path)?;
        map.insert(snapshot.id.clone(), snapshot.clone());
        Self::save_map(&self.per_source_path, &map)
    }

    fn scan_aggregates(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<AggregateSnapshot>, StoreError> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let map: HashMap<String, AggregateSnapshot> = Self::load_map(&self.aggregates_path)?;
        Ok(map
            .into_values()
            .filter(|s| in_range(&s.date, start, end))
            .collect())
    }
}
