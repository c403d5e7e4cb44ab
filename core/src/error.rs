use std::io;

use thiserror::Error;

use crate::graph::NodeId;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Failures reported by the graph store, the traversal engine and snapshot I/O.
///
/// An unreachable destination is not an error: distance queries return
/// [`UNREACHABLE`](crate::UNREACHABLE) and path queries return `None`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("invalid weight {weight} for edge ({from}, {to}): must be finite and non-negative")]
    InvalidWeight { from: NodeId, to: NodeId, weight: f64 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("graph needs ~{estimated_mb}MB, exceeds max_memory_mb = {limit_mb}")]
    MemoryLimitExceeded { estimated_mb: usize, limit_mb: usize },
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => GraphError::Io(err.into()),
            _ => GraphError::Serialization(err.to_string()),
        }
    }
}
