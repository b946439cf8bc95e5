//! Per-session key-value store.
//!
//! Every pass of a page reads from and writes to one `SessionStore`.
//! Values written during a pass are visible to every later pass of the
//! same session until they are overwritten or removed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Flat string-keyed map of JSON values, scoped to one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionStore {
    values: BTreeMap<String, Value>,
}

impl SessionStore {
    /// Create an empty store (first visit of a session).
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the raw value at `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get the value at `key` decoded as `T`.
    ///
    /// Returns `None` if the key is missing or holds a value of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write `value` at `key`, replacing any previous value.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.into(), value);
        Ok(())
    }

    /// Write an already-encoded value at `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check whether `key` has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Drop every entry (session reset).
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Load a store previously written by [`flush`](Self::flush).
    ///
    /// A missing file yields an empty store.
    pub fn restore(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let bytes = fs::read(path)?;
        let store: SessionStore = serde_json::from_slice(&bytes)?;
        tracing::debug!("Restored {} session keys from {}", store.len(), path.display());
        Ok(store)
    }

    /// Persist the store as pretty-printed JSON.
    pub fn flush(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl FromIterator<(String, Value)> for SessionStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut store = SessionStore::new();
        store.set("name", "Ada").unwrap();
        store.set("count", 3).unwrap();

        assert_eq!(store.get("name"), Some(&json!("Ada")));
        assert_eq!(store.get_as::<i64>("count"), Some(3));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_as_wrong_shape_is_none() {
        let mut store = SessionStore::new();
        store.set("count", "three").unwrap();
        assert_eq!(store.get_as::<i64>("count"), None);
    }

    #[test]
    fn test_missing_key() {
        let store = SessionStore::new();
        assert!(store.get("missing").is_none());
        assert!(!store.contains("missing"));
    }

    #[test]
    fn test_flush_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let mut store = SessionStore::new();
        store.set("slider_key", 5).unwrap();
        store.set("show", true).unwrap();
        store.flush(&path).unwrap();

        let restored = SessionStore::restore(&path).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_restore_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::restore(dir.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }
}
