//! wgraph-core: In-memory undirected weighted graph.
//!
//! A pure Rust library that keeps an adjacency map per node (O(1) edge
//! lookup, O(degree) neighbor iteration) and answers connectivity and
//! Dijkstra shortest-path queries over it. Snapshots serialize to JSON and
//! restore fail-safe.
//!
//! Single-threaded: a `Graph` has no internal locking. Queries only borrow
//! it and keep their scratch state in a per-query [`Relaxation`].

mod algo;
mod config;
mod error;
mod graph;
mod snapshot;
mod traversal;

pub use algo::GraphAlgo;
pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{EdgeRecord, Graph, NodeId, NodeInfo, NO_EDGE};
pub use snapshot::{GraphSnapshot, NodeRecord};
pub use traversal::{
    degree_centrality, is_connected, neighborhood, relax, shortest_path, shortest_path_distance,
    DegreeResult, Marker, NeighborResult, Relaxation, UNREACHABLE,
};
