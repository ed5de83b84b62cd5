//! Error types for the morphstore-transform subsystem

/// All errors that can occur while applying a transformation
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The requested slice lies outside the transformed buffer
    #[error("requested range {offset}+{length} outside transformed buffer of {available} bytes")]
    RangeOutOfBounds {
        /// Requested logical offset
        offset: u64,
        /// Requested length in bytes
        length: u64,
        /// Bytes actually available in the transformed buffer
        available: u64,
    },
}
