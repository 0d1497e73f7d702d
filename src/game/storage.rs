//! Score Persistence
//!
//! Integer key/value store behind the high score. Reads never fail (a
//! missing key yields the caller's default); writes are buffered until
//! `flush`, which is the only fallible operation.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

/// Errors from a persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("score store I/O error at {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Stored document is not valid JSON
    #[error("score store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Integer key/value persistence.
pub trait ScoreStore {
    /// Value for `key`, or `default` if absent.
    fn get_int(&self, key: &str, default: i32) -> i32;

    /// Buffer a write.
    fn set_int(&mut self, key: &str, value: i32);

    /// Make buffered writes durable.
    fn flush(&mut self) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Used by tests and replays.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, i32>,
    flushes: u32,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one key.
    pub fn with_value(key: &str, value: i32) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_owned(), value);
        store
    }

    /// Number of `flush` calls so far.
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl ScoreStore for MemoryStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_owned(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flushes += 1;
        Ok(())
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    values: BTreeMap<String, i32>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

/// Store backed by a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, i32>,
    saved_at: Option<DateTime<Utc>>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let document = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<StoreDocument>(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreDocument::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        debug!(path = %path.display(), keys = document.values.len(), "Score store opened");

        Ok(Self {
            path,
            values: document.values,
            saved_at: document.saved_at,
            dirty: false,
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the file was last written.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }
}

impl ScoreStore for JsonFileStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i32) {
        if self.values.insert(key.to_owned(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        let saved_at = Utc::now();
        let document = StoreDocument {
            values: self.values.clone(),
            saved_at: Some(saved_at),
        };
        let text = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.saved_at = Some(saved_at);
        self.dirty = false;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("lane-runner-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_memory_store_defaults() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_int("HighScore", 0), 0);
        assert_eq!(store.get_int("HighScore", 7), 7);

        store.set_int("HighScore", 12);
        store.flush().unwrap();
        assert_eq!(store.get_int("HighScore", 0), 12);
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn test_json_store_round_trip() {
        let path = temp_path("round_trip.json");
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_int("HighScore", 0), 0);
        assert!(store.saved_at().is_none());

        store.set_int("HighScore", 42);
        store.flush().unwrap();
        assert!(store.saved_at().is_some());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_int("HighScore", 0), 42);
        assert!(reopened.saved_at().is_some());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_json_store_skips_clean_flush() {
        let path = temp_path("clean.json");
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        store.flush().unwrap();
        assert!(!path.exists(), "nothing written without changes");
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let path = temp_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
        let _ = fs::remove_file(&path);
    }
}
