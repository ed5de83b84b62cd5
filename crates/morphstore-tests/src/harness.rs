//! Test harness: in-memory store fixtures.

use std::sync::Arc;

use morphstore_object::{
    Batch, ChunkedObject, ChunkedObjectHandle, ClusterConfig, MemoryKvStore, MemoryObjectBackend,
    ObjectError, Semantics, StoreContext,
};
use morphstore_transform::{TransformationMode, TransformationType};

/// An all-in-memory store with direct access to its backend and KV handles,
/// so tests can observe stored forms and persisted records.
pub struct TestStore {
    /// Raw object backend
    pub backend: Arc<MemoryObjectBackend>,
    /// Metadata KV store
    pub kv: Arc<MemoryKvStore>,
    /// The context object handles are built from
    pub ctx: StoreContext,
}

impl TestStore {
    /// A store with the given number of object servers.
    pub fn new(object_server_count: u32) -> Self {
        let backend = Arc::new(MemoryObjectBackend::new());
        let kv = Arc::new(MemoryKvStore::new());
        let ctx = StoreContext::new(
            backend.clone(),
            kv.clone(),
            ClusterConfig {
                object_server_count,
            },
        );
        Self { backend, kv, ctx }
    }

    /// Single-server store.
    pub fn single() -> Self {
        Self::new(1)
    }

    /// A chunked-object handle in this store.
    pub fn object(&self, namespace: &str, name: &str) -> ChunkedObjectHandle {
        ChunkedObject::new(self.ctx.clone(), namespace, name)
            .expect("test store has a valid server count")
    }

    /// Creates an object and executes the create batch, panicking on failure.
    pub fn create_object(
        &self,
        namespace: &str,
        name: &str,
        kind: TransformationType,
        mode: TransformationMode,
        chunk_size: u64,
    ) -> Result<ChunkedObjectHandle, ObjectError> {
        let object = self.object(namespace, name);
        let mut batch = Batch::new(Semantics::default());
        object.create(kind, mode, chunk_size, &mut batch)?;
        assert!(batch.execute(), "create batch failed");
        Ok(object)
    }
}

/// Installs a fmt subscriber for ad-hoc debugging of failing tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
