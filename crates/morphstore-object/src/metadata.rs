//! Persisted metadata records.
//!
//! One record per object, keyed by the object's name inside its namespace.
//! A record exists exactly while the object exists; it reflects the state as
//! of the last successfully executed write/create, so readers reload it
//! before trusting size or chunk fields.

use morphstore_transform::{TransformationMode, TransformationType};
use serde::{Deserialize, Serialize};

use crate::error::ObjectError;

/// Metadata record for a per-chunk transformation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Codec applied to the object's bytes
    pub transformation_type: TransformationType,
    /// Which pipeline participant applies it
    pub transformation_mode: TransformationMode,
    /// Size of the object in its untransformed state
    pub original_size: u64,
    /// Size of the object as stored
    pub transformed_size: u64,
}

/// Metadata record for a chunked logical object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedMetadata {
    /// Codec applied to every chunk
    pub transformation_type: TransformationType,
    /// Which pipeline participant applies it
    pub transformation_mode: TransformationMode,
    /// Number of chunk objects holding the data
    pub chunk_count: u64,
    /// Maximum original bytes per chunk
    pub chunk_size: u64,
}

impl ObjectMetadata {
    /// Serialize for the KV store.
    pub fn encode(&self) -> Result<Vec<u8>, ObjectError> {
        bincode::serialize(self).map_err(|e| ObjectError::MetadataEncoding(e.to_string()))
    }

    /// Deserialize from the KV store.
    pub fn decode(bytes: &[u8]) -> Result<Self, ObjectError> {
        bincode::deserialize(bytes).map_err(|e| ObjectError::MetadataEncoding(e.to_string()))
    }
}

impl ChunkedMetadata {
    /// Serialize for the KV store.
    pub fn encode(&self) -> Result<Vec<u8>, ObjectError> {
        bincode::serialize(self).map_err(|e| ObjectError::MetadataEncoding(e.to_string()))
    }

    /// Deserialize from the KV store.
    pub fn decode(bytes: &[u8]) -> Result<Self, ObjectError> {
        bincode::deserialize(bytes).map_err(|e| ObjectError::MetadataEncoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_metadata_roundtrip() {
        let record = ObjectMetadata {
            transformation_type: TransformationType::Rle,
            transformation_mode: TransformationMode::Client,
            original_size: 9,
            transformed_size: 4,
        };
        let decoded = ObjectMetadata::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_chunked_metadata_roundtrip() {
        let record = ChunkedMetadata {
            transformation_type: TransformationType::Lz4,
            transformation_mode: TransformationMode::Transport,
            chunk_count: 3,
            chunk_size: 4096,
        };
        let decoded = ChunkedMetadata::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(ChunkedMetadata::decode(&[0xFF; 3]).is_err());
    }
}
