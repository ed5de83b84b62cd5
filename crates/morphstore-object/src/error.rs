//! Error types for the morphstore-object subsystem

use morphstore_transform::TransformError;

/// All errors that can occur in the object layer
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// Caller bug rejected at queue time, before any I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The backend object does not exist
    #[error("object not found: {namespace}/{name}")]
    NotFound {
        /// Object namespace
        namespace: String,
        /// Object name
        name: String,
    },
    /// No metadata record exists for the object
    #[error("metadata missing for {namespace}/{name}")]
    MetadataMissing {
        /// Object namespace
        namespace: String,
        /// Object name
        name: String,
    },
    /// Metadata record failed to encode or decode
    #[error("metadata encoding failed: {0}")]
    MetadataEncoding(String),
    /// Key-value store failure
    #[error("kv store error: {0}")]
    Kv(String),
    /// Object backend failure
    #[error("backend error: {0}")]
    Backend(String),
    /// Transformation failure
    #[error(transparent)]
    Transform(#[from] TransformError),
}
