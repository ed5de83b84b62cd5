//! Shared storage handles every object operation executes against.

use std::sync::Arc;

use crate::backend::ObjectBackend;
use crate::config::ClusterConfig;
use crate::kv::KvStore;

/// Bundle of backend handles and cluster configuration, cloned into every
/// object handle at construction.
#[derive(Clone)]
pub struct StoreContext {
    /// Raw object storage
    pub backend: Arc<dyn ObjectBackend>,
    /// Metadata key-value store
    pub kv: Arc<dyn KvStore>,
    /// Cluster parameters (server count for routing)
    pub config: ClusterConfig,
}

impl StoreContext {
    /// Creates a context from its parts.
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        kv: Arc<dyn KvStore>,
        config: ClusterConfig,
    ) -> Self {
        Self {
            backend,
            kv,
            config,
        }
    }

    /// All-in-memory context for tests and single-process use.
    pub fn in_memory(config: ClusterConfig) -> Self {
        Self {
            backend: Arc::new(crate::backend::MemoryObjectBackend::new()),
            kv: Arc::new(crate::kv::MemoryKvStore::new()),
            config,
        }
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
