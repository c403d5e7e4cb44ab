use serde::{Deserialize, Serialize};

/// Tuning knobs for building and restoring graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Pre-allocation hint for the node map.
    pub node_capacity: usize,
    /// Restore refuses snapshots whose estimated footprint exceeds this many MB.
    /// `None` = unlimited.
    pub max_memory_mb: Option<usize>,
}

impl GraphConfig {
    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    pub fn with_max_memory_mb(mut self, max_memory_mb: usize) -> Self {
        self.max_memory_mb = Some(max_memory_mb);
        self
    }
}
