#![warn(missing_docs)]

//! Morphstore object layer: transformation-aware per-chunk objects, the
//! chunked logical-object abstraction with persisted metadata, and the
//! deferred batch scheduler that executes queued operations.
//!
//! Queuing never performs I/O; all effects happen inside
//! [`Batch::execute`](batch::Batch::execute).

pub mod backend;
pub mod batch;
pub mod chunked;
pub mod config;
pub mod context;
pub mod error;
pub mod kv;
pub mod metadata;
pub mod object;
pub mod routing;

pub use backend::{BackendStatus, MemoryObjectBackend, ObjectBackend};
pub use batch::{Atomicity, Batch, Operation, Semantics};
pub use chunked::{ChunkedObject, ChunkedObjectHandle, ObjectStatus, OutCell, SharedBuf};
pub use config::ClusterConfig;
pub use context::StoreContext;
pub use error::ObjectError;
pub use kv::{KvStore, MemoryKvStore};
pub use metadata::{ChunkedMetadata, ObjectMetadata};
pub use object::{TransformObject, TransformObjectStatus};
pub use routing::route_index;
