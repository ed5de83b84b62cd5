//! Key-value store for per-object metadata records.
//!
//! The trait abstracts over the metadata backend; the in-memory
//! implementation backs tests and single-process deployments.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::ObjectError;

/// Key-value store trait for metadata persistence.
///
/// Keys are scoped by namespace; `iterate` mirrors the metadata-backend
/// cursor that yields every record for a (namespace, prefix) pair.
pub trait KvStore: Send + Sync {
    /// Store a record. Overwrites any existing value.
    fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), ObjectError>;

    /// Fetch a record. Returns None if the key doesn't exist.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ObjectError>;

    /// Delete a record. Returns Ok(()) even if the key didn't exist.
    fn delete(&self, namespace: &str, key: &str) -> Result<(), ObjectError>;

    /// All records in `namespace` whose key starts with `prefix`, in sorted
    /// key order.
    fn iterate(&self, namespace: &str, prefix: &str)
        -> Result<Vec<(String, Vec<u8>)>, ObjectError>;
}

/// In-memory KV store backed by a BTreeMap. Thread-safe via RwLock.
///
/// Does not persist data across restarts.
pub struct MemoryKvStore {
    data: Arc<RwLock<BTreeMap<(String, String), Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Creates a new empty in-memory KV store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryKvStore {
    fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), ObjectError> {
        let mut data = self.data.write().map_err(|e| ObjectError::Kv(e.to_string()))?;
        data.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ObjectError> {
        let data = self.data.read().map_err(|e| ObjectError::Kv(e.to_string()))?;
        Ok(data
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), ObjectError> {
        let mut data = self.data.write().map_err(|e| ObjectError::Kv(e.to_string()))?;
        data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    fn iterate(
        &self,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, ObjectError> {
        let data = self.data.read().map_err(|e| ObjectError::Kv(e.to_string()))?;
        let mut result = Vec::new();
        for ((ns, key), value) in data.range((namespace.to_string(), String::new())..) {
            if ns != namespace {
                break;
            }
            if key.starts_with(prefix) {
                result.push((key.clone(), value.clone()));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let store = MemoryKvStore::new();
        store.put("ns", "key1", b"value1".to_vec()).unwrap();
        assert_eq!(store.get("ns", "key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("ns", "key2").unwrap(), None);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = MemoryKvStore::new();
        store.put("a", "key", b"1".to_vec()).unwrap();
        store.put("b", "key", b"2".to_vec()).unwrap();
        assert_eq!(store.get("a", "key").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("b", "key").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryKvStore::new();
        store.delete("ns", "missing").unwrap();
        store.put("ns", "key", b"v".to_vec()).unwrap();
        store.delete("ns", "key").unwrap();
        assert_eq!(store.get("ns", "key").unwrap(), None);
    }

    #[test]
    fn test_iterate_prefix() {
        let store = MemoryKvStore::new();
        store.put("ns", "obj_0", b"0".to_vec()).unwrap();
        store.put("ns", "obj_1", b"1".to_vec()).unwrap();
        store.put("ns", "other", b"x".to_vec()).unwrap();
        store.put("zz", "obj_2", b"2".to_vec()).unwrap();

        let result = store.iterate("ns", "obj").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, "obj_0");
        assert_eq!(result[1].0, "obj_1");
    }

    #[test]
    fn test_overwrite() {
        let store = MemoryKvStore::new();
        store.put("ns", "key", b"v1".to_vec()).unwrap();
        store.put("ns", "key", b"v2".to_vec()).unwrap();
        assert_eq!(store.get("ns", "key").unwrap(), Some(b"v2".to_vec()));
    }
}
