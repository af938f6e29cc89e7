//! On-disk checkpoint of work-unit outcomes.
//!
//! The file is a flat JSON object mapping a work-unit key (track id) to
//! either a numeric success value or a failure tag string:
//!
//! ```text
//! {
//!     "4uLU6hMCjMI75M1A2tKUQC": 1532044,
//!     "7ouMYWpwJ422jRcDASZB7P": "TIMEOUT"
//! }
//! ```
//!
//! Every flush rewrites the complete mapping; there are no delta writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PersistenceError, SetupError};
use crate::models::CheckpointValue;
use crate::storage::{read_json, write_json_atomic};

/// Key → last known outcome
pub type CheckpointMap = BTreeMap<String, CheckpointValue>;

/// Reads and writes one checkpoint file. Single writer per file.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the mapping. A missing file is an empty mapping; a file that
    /// cannot be read or parsed is fatal, since starting from a wrong cache
    /// would either redo or silently skip work.
    pub fn load(&self) -> Result<CheckpointMap, SetupError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// Overwrite the file with the full current mapping.
    pub fn flush(&self, map: &CheckpointMap) -> Result<(), PersistenceError> {
        write_json_atomic(&self.path, map)
    }
}

/// When to write intermediate checkpoints.
///
/// `completed` counts units that went through a source call (success or
/// classified failure). Skipped units carry nothing new and do not count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushPolicy {
    interval: usize,
}

impl FlushPolicy {
    /// `interval == 0` disables intermediate flushes (the final flush still happens).
    pub fn every(interval: usize) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn is_due(&self, completed: usize) -> bool {
        self.interval > 0 && completed > 0 && completed % self.interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureTag;
    use std::fs;

    fn mixed_map() -> CheckpointMap {
        let mut map = CheckpointMap::new();
        map.insert("a".to_string(), CheckpointValue::Count(0));
        map.insert("b".to_string(), CheckpointValue::Count(987_654_321));
        for (i, tag) in FailureTag::ALL.into_iter().enumerate() {
            map.insert(format!("f{}", i), CheckpointValue::Failed(tag));
        }
        map
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("playcount.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_flush_then_load_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("playcount.json"));
        let map = mixed_map();
        store.flush(&map).unwrap();
        assert_eq!(store.load().unwrap(), map);
    }

    #[test]
    fn test_repeated_flush_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("playcount.json"));

        let mut map = mixed_map();
        store.flush(&map).unwrap();
        map.remove("a");
        map.insert("c".to_string(), CheckpointValue::Count(3));
        store.flush(&map).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, map);
        assert!(!loaded.contains_key("a"));
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("playcount.json"));
        let mut map = CheckpointMap::new();
        map.insert("t1".to_string(), CheckpointValue::Count(42));
        map.insert("t2".to_string(), CheckpointValue::Failed(FailureTag::ParseError));
        store.flush(&map).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "{\n    \"t1\": 42,\n    \"t2\": \"PARSE_ERROR\"\n}\n");
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playcount.json");

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            CheckpointStore::new(&path).load(),
            Err(SetupError::Malformed { .. })
        ));

        fs::write(&path, r#"{"t1": "MAYBE"}"#).unwrap();
        assert!(CheckpointStore::new(&path).load().is_err());
    }

    #[test]
    fn test_flush_policy() {
        let policy = FlushPolicy::every(2);
        let due: Vec<usize> = (0..=5).filter(|&n| policy.is_due(n)).collect();
        assert_eq!(due, vec![2, 4]);

        let disabled = FlushPolicy::every(0);
        assert!((0..100).all(|n| !disabled.is_due(n)));
    }
}
