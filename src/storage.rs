//! Key/value preference storage.
//!
//! `Storage` persists preferences in sled; `MemoryStore` keeps them for the
//! lifetime of the process. Both sit behind [`PreferenceStore`] so callers
//! receive the capability instead of reaching for ambient state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A stored preference value with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreference {
    /// The raw preference value
    pub value: String,
    /// When the value was last written
    pub updated_at: DateTime<Utc>,
}

impl StoredPreference {
    /// Create a new stored preference stamped with the current time
    pub fn new(value: String) -> Self {
        Self {
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Read/write access to named preferences.
pub trait PreferenceStore {
    /// Fetch a preference with its metadata
    fn get_entry(&self, name: &str) -> Result<Option<StoredPreference>, StorageError>;

    /// Write a preference, replacing any previous value
    fn set_preference(&self, name: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a preference, returning whether it existed
    fn remove_preference(&self, name: &str) -> Result<bool, StorageError>;

    /// Fetch a preference value
    fn get_preference(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_entry(name)?.map(|entry| entry.value))
    }
}

/// Sled-based storage for preferences.
#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Get the number of stored preferences
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

impl PreferenceStore for Storage {
    fn get_entry(&self, name: &str) -> Result<Option<StoredPreference>, StorageError> {
        match self.db.get(name.as_bytes())? {
            Some(data) => {
                let stored: StoredPreference = serde_json::from_slice(&data)?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    fn set_preference(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let stored = StoredPreference::new(value.to_string());
        let bytes = serde_json::to_vec(&stored)?;
        self.db.insert(name.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove_preference(&self, name: &str) -> Result<bool, StorageError> {
        let existed = self.db.remove(name.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredPreference>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given preferences
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, value)| (name.into(), StoredPreference::new(value.into())))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredPreference>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for MemoryStore {
    fn get_entry(&self, name: &str) -> Result<Option<StoredPreference>, StorageError> {
        Ok(self.entries().get(name).cloned())
    }

    fn set_preference(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.entries()
            .insert(name.to_string(), StoredPreference::new(value.to_string()));
        Ok(())
    }

    fn remove_preference(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.entries().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sled_store_round_trips_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.set_preference("summaryLength", "short").unwrap();
            assert_eq!(
                storage.get_preference("summaryLength").unwrap().as_deref(),
                Some("short")
            );
            assert_eq!(storage.count(), 1);
        }

        let reopened = Storage::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get_preference("summaryLength").unwrap().as_deref(),
            Some("short")
        );
    }

    #[test]
    fn sled_store_remove_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.set_preference("apiKey", "sk-ant-test").unwrap();
        assert!(storage.remove_preference("apiKey").unwrap());
        assert!(!storage.remove_preference("apiKey").unwrap());
        assert!(storage.get_preference("apiKey").unwrap().is_none());
    }

    #[test]
    fn overwriting_refreshes_timestamp() {
        let store = MemoryStore::new();
        store.set_preference("summaryLength", "short").unwrap();
        let first = store.get_entry("summaryLength").unwrap().unwrap();

        store.set_preference("summaryLength", "detailed").unwrap();
        let second = store.get_entry("summaryLength").unwrap().unwrap();

        assert_eq!(second.value, "detailed");
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn memory_store_with_entries() {
        let store = MemoryStore::with_entries([("apiKey", "abc")]);
        assert_eq!(store.get_preference("apiKey").unwrap().as_deref(), Some("abc"));
        assert!(store.get_preference("missing").unwrap().is_none());
    }
}
