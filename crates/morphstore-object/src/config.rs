//! Cluster configuration, passed explicitly into object construction.

use serde::{Deserialize, Serialize};

/// Static cluster parameters the object layer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of object servers names can be routed to
    pub object_server_count: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            object_server_count: 1,
        }
    }
}
