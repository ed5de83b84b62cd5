//! Raw per-server object storage.
//!
//! The backend stores opaque byte objects keyed by (namespace, name). The
//! transformation layers above decide what form those bytes are in.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ObjectError;

/// Modification time and stored size of a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    /// Last modification, microseconds since the Unix epoch
    pub modification_time: i64,
    /// Stored size in bytes
    pub size: u64,
}

/// Raw byte-object storage the transformation layers write into.
pub trait ObjectBackend: Send + Sync {
    /// Create an empty object. Overwrites an existing one.
    fn create(&self, namespace: &str, name: &str) -> Result<(), ObjectError>;

    /// Delete an object.
    fn delete(&self, namespace: &str, name: &str) -> Result<(), ObjectError>;

    /// Read up to `buf.len()` bytes starting at `offset`. Returns the number
    /// of bytes read; short when the object ends inside the range.
    fn read(
        &self,
        namespace: &str,
        name: &str,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<u64, ObjectError>;

    /// Write `data` at `offset`, growing the object as needed. Returns the
    /// number of bytes written.
    fn write(
        &self,
        namespace: &str,
        name: &str,
        data: &[u8],
        offset: u64,
    ) -> Result<u64, ObjectError>;

    /// Modification time and stored size.
    fn status(&self, namespace: &str, name: &str) -> Result<BackendStatus, ObjectError>;
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

struct StoredObject {
    data: Vec<u8>,
    modification_time: i64,
}

/// In-memory object backend. Thread-safe via RwLock.
///
/// Does not persist data across restarts.
pub struct MemoryObjectBackend {
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
}

impl MemoryObjectBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryObjectBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBackend for MemoryObjectBackend {
    fn create(&self, namespace: &str, name: &str) -> Result<(), ObjectError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| ObjectError::Backend(e.to_string()))?;
        objects.insert(
            (namespace.to_string(), name.to_string()),
            StoredObject {
                data: Vec::new(),
                modification_time: now_micros(),
            },
        );
        Ok(())
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<(), ObjectError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| ObjectError::Backend(e.to_string()))?;
        objects
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ObjectError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    fn read(
        &self,
        namespace: &str,
        name: &str,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<u64, ObjectError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ObjectError::Backend(e.to_string()))?;
        let object = objects
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ObjectError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let size = object.data.len() as u64;
        if offset >= size {
            return Ok(0);
        }
        let n = buf.len().min((size - offset) as usize);
        let start = offset as usize;
        buf[..n].copy_from_slice(&object.data[start..start + n]);
        Ok(n as u64)
    }

    fn write(
        &self,
        namespace: &str,
        name: &str,
        data: &[u8],
        offset: u64,
    ) -> Result<u64, ObjectError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| ObjectError::Backend(e.to_string()))?;
        let object = objects
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ObjectError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let end = offset as usize + data.len();
        if object.data.len() < end {
            object.data.resize(end, 0);
        }
        object.data[offset as usize..end].copy_from_slice(data);
        object.modification_time = now_micros();
        Ok(data.len() as u64)
    }

    fn status(&self, namespace: &str, name: &str) -> Result<BackendStatus, ObjectError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ObjectError::Backend(e.to_string()))?;
        let object = objects
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ObjectError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        Ok(BackendStatus {
            modification_time: object.modification_time,
            size: object.data.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_write_read() {
        let backend = MemoryObjectBackend::new();
        backend.create("ns", "obj").unwrap();
        assert_eq!(backend.write("ns", "obj", b"hello", 0).unwrap(), 5);

        let mut buf = [0u8; 5];
        assert_eq!(backend.read("ns", "obj", &mut buf, 0).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_read_missing_object_fails() {
        let backend = MemoryObjectBackend::new();
        let mut buf = [0u8; 4];
        assert!(matches!(
            backend.read("ns", "nope", &mut buf, 0),
            Err(ObjectError::NotFound { .. })
        ));
    }

    #[test]
    fn test_sparse_write_zero_fills() {
        let backend = MemoryObjectBackend::new();
        backend.create("ns", "obj").unwrap();
        backend.write("ns", "obj", b"xy", 4).unwrap();

        let mut buf = [0xAAu8; 6];
        assert_eq!(backend.read("ns", "obj", &mut buf, 0).unwrap(), 6);
        assert_eq!(&buf, b"\0\0\0\0xy");
    }

    #[test]
    fn test_short_read_at_tail() {
        let backend = MemoryObjectBackend::new();
        backend.create("ns", "obj").unwrap();
        backend.write("ns", "obj", b"abcdef", 0).unwrap();

        let mut buf = [0u8; 10];
        assert_eq!(backend.read("ns", "obj", &mut buf, 4).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(backend.read("ns", "obj", &mut buf, 100).unwrap(), 0);
    }

    #[test]
    fn test_status_tracks_size_and_mtime() {
        let backend = MemoryObjectBackend::new();
        backend.create("ns", "obj").unwrap();
        let before = backend.status("ns", "obj").unwrap();
        assert_eq!(before.size, 0);

        backend.write("ns", "obj", b"123", 0).unwrap();
        let after = backend.status("ns", "obj").unwrap();
        assert_eq!(after.size, 3);
        assert!(after.modification_time >= before.modification_time);
    }

    #[test]
    fn test_delete() {
        let backend = MemoryObjectBackend::new();
        backend.create("ns", "obj").unwrap();
        backend.delete("ns", "obj").unwrap();
        assert!(backend.status("ns", "obj").is_err());
        assert!(backend.delete("ns", "obj").is_err());
    }
}
