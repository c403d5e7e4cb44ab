use std::collections::HashSet;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::{estimate_memory, EdgeRecord, Graph, NodeId};

/// A node as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: NodeId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
}

/// Full-fidelity image of a graph: every node, every edge, and the counters.
///
/// Nodes are sorted by key and edges by `(from, to)` with `from < to`, so
/// equal graphs with equal counters encode to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub node_count: usize,
    pub edge_count: usize,
    pub mod_count: u64,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl Graph {
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<NodeRecord> = self
            .nodes()
            .map(|n| NodeRecord {
                key: n.key(),
                info: n.info().to_string(),
            })
            .collect();
        nodes.sort_by_key(|n| n.key);

        let mut edges: Vec<EdgeRecord> = self.edges().collect();
        edges.sort_by_key(|e| (e.from, e.to));

        GraphSnapshot {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            mod_count: self.mod_count(),
            nodes,
            edges,
        }
    }

    /// Replace this graph with the contents of `snapshot`.
    ///
    /// On error the graph is left exactly as it was.
    pub fn restore(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        self.restore_with(snapshot, &GraphConfig::default())
    }

    /// [`restore`](Self::restore) honoring `config.max_memory_mb`.
    pub fn restore_with(&mut self, snapshot: GraphSnapshot, config: &GraphConfig) -> Result<()> {
        match build_from_snapshot(snapshot, config) {
            Ok(graph) => {
                debug!(
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    mod_count = graph.mod_count(),
                    "restored graph from snapshot"
                );
                *self = graph;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "snapshot rejected, graph left unchanged");
                Err(err)
            }
        }
    }

    /// Encode a snapshot of this graph as JSON.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.snapshot())?;
        Ok(())
    }

    /// Decode a JSON snapshot and [`restore`](Self::restore) from it.
    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<()> {
        self.read_from_with(reader, &GraphConfig::default())
    }

    pub fn read_from_with<R: Read>(&mut self, reader: R, config: &GraphConfig) -> Result<()> {
        let snapshot: GraphSnapshot = serde_json::from_reader(reader)?;
        self.restore_with(snapshot, config)
    }
}

fn corrupt(msg: String) -> GraphError {
    GraphError::CorruptSnapshot(msg)
}

/// Validate `snapshot` and rebuild a fresh graph from it.
fn build_from_snapshot(snapshot: GraphSnapshot, config: &GraphConfig) -> Result<Graph> {
    if snapshot.nodes.len() != snapshot.node_count {
        return Err(corrupt(format!(
            "node_count is {} but {} nodes are listed",
            snapshot.node_count,
            snapshot.nodes.len()
        )));
    }
    if snapshot.edges.len() != snapshot.edge_count {
        return Err(corrupt(format!(
            "edge_count is {} but {} edges are listed",
            snapshot.edge_count,
            snapshot.edges.len()
        )));
    }

    if let Some(limit_mb) = config.max_memory_mb {
        let estimated_mb = estimate_memory(snapshot.node_count, snapshot.edge_count) / 1_048_576;
        if estimated_mb > limit_mb {
            return Err(GraphError::MemoryLimitExceeded {
                estimated_mb,
                limit_mb,
            });
        }
    }

    let mut graph = Graph::with_capacity(snapshot.node_count.max(config.node_capacity));
    for node in snapshot.nodes {
        if graph.contains_node(node.key) {
            return Err(corrupt(format!("node {} listed twice", node.key)));
        }
        graph.add_node(node.key);
        if !node.info.is_empty() {
            if let Some(n) = graph.node_mut(node.key) {
                n.set_info(node.info);
            }
        }
    }

    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::with_capacity(snapshot.edge_count);
    for e in snapshot.edges {
        if e.from == e.to {
            return Err(corrupt(format!("self-loop on node {}", e.from)));
        }
        if !seen.insert((e.from.min(e.to), e.from.max(e.to))) {
            return Err(corrupt(format!("edge ({}, {}) listed twice", e.from, e.to)));
        }
        graph.connect(e.from, e.to, e.weight).map_err(|err| match err {
            GraphError::NodeNotFound(id) => {
                corrupt(format!("edge ({}, {}) references missing node {}", e.from, e.to, id))
            }
            other => corrupt(other.to_string()),
        })?;
    }

    graph.set_mod_count(snapshot.mod_count);
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_small() -> Graph {
        let mut g = Graph::new();
        for i in 0..5 {
            g.add_node(i);
        }
        for (a, b, w) in [(0, 1, 0.5), (1, 2, 1.5), (1, 3, 0.25), (2, 3, 4.0), (3, 4, 0.0)] {
            g.connect(a, b, w).unwrap();
        }
        g.node_mut(4).unwrap().set_info("leaf");
        g
    }

    #[test]
    fn test_snapshot_contents() {
        let g = make_small();
        let snap = g.snapshot();
        assert_eq!(snap.node_count, 5);
        assert_eq!(snap.edge_count, 5);
        assert_eq!(snap.mod_count, 10);
        assert_eq!(snap.nodes.iter().map(|n| n.key).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(snap.edges[0], EdgeRecord { from: 0, to: 1, weight: 0.5 });
        assert_eq!(snap.nodes[4].info, "leaf");
    }

    #[test]
    fn test_restore_replaces_state() {
        let g = make_small();
        let mut other = Graph::new();
        other.add_node(100);
        other.restore(g.snapshot()).unwrap();
        assert_eq!(other, g);
        assert_eq!(other.mod_count(), g.mod_count());
        assert!(!other.contains_node(100));
        assert_eq!(other.node(4).unwrap().info(), "leaf");
    }

    #[test]
    fn test_json_round_trip() {
        let g = make_small();
        let mut buf = Vec::new();
        g.write_to(&mut buf).unwrap();

        let mut restored = Graph::new();
        restored.read_from(buf.as_slice()).unwrap();
        assert_eq!(restored, g);
        assert_eq!(restored.edge_count(), 5);
        assert_eq!(restored.mod_count(), 10);
    }

    #[test]
    fn test_fractional_weights_survive_json() {
        let weights = [0.1, 1.0 / 3.0, 9.87654321, 2.0f64.sqrt(), 1e-300, 123456.789e10];
        let mut g = Graph::new();
        for i in 0..=weights.len() as NodeId {
            g.add_node(i);
        }
        for (i, &w) in weights.iter().enumerate() {
            g.connect(i as NodeId, i as NodeId + 1, w).unwrap();
        }

        let mut buf = Vec::new();
        g.write_to(&mut buf).unwrap();
        let mut restored = Graph::new();
        restored.read_from(buf.as_slice()).unwrap();

        for (i, &w) in weights.iter().enumerate() {
            let got = restored.weight(i as NodeId, i as NodeId + 1).unwrap();
            assert_eq!(got.to_bits(), w.to_bits(), "weight {w} changed to {got}");
        }
        assert_eq!(restored, g);
    }

    #[test]
    fn test_identical_graphs_identical_bytes() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        make_small().write_to(&mut a).unwrap();
        make_small().write_to(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_input_leaves_graph() {
        let mut g = make_small();
        let err = g.read_from(&b"{not json"[..]).unwrap_err();
        assert!(matches!(err, GraphError::Serialization(_)));
        assert_eq!(g, make_small());
        assert_eq!(g.mod_count(), 10);
    }

    #[test]
    fn test_truncated_input_leaves_graph() {
        let mut buf = Vec::new();
        make_small().write_to(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);

        let mut g = make_small();
        g.remove_node(0);
        let before = g.snapshot();
        assert!(g.read_from(buf.as_slice()).is_err());
        assert_eq!(g.snapshot(), before);
    }

    #[test]
    fn test_rejects_count_mismatch() {
        let mut snap = make_small().snapshot();
        snap.edge_count = 7;
        let mut g = Graph::new();
        assert!(matches!(g.restore(snap), Err(GraphError::CorruptSnapshot(_))));
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn test_rejects_dangling_edge() {
        let mut snap = make_small().snapshot();
        snap.edges[0].to = 99;
        let mut g = make_small();
        let err = g.restore(snap).unwrap_err();
        assert!(err.to_string().contains("missing node 99"));
        assert_eq!(g, make_small());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut snap = make_small().snapshot();
        snap.edges[1].weight = -2.0;
        let mut g = Graph::new();
        assert!(matches!(g.restore(snap), Err(GraphError::CorruptSnapshot(_))));
    }

    #[test]
    fn test_rejects_self_loop_and_duplicates() {
        let mut snap = make_small().snapshot();
        snap.edges[0] = EdgeRecord { from: 2, to: 2, weight: 1.0 };
        assert!(Graph::new().restore(snap).is_err());

        let mut snap = make_small().snapshot();
        snap.edges[0] = EdgeRecord { from: 3, to: 1, weight: 0.25 };
        assert!(Graph::new().restore(snap).is_err());

        let mut snap = make_small().snapshot();
        snap.nodes[1].key = 0;
        assert!(Graph::new().restore(snap).is_err());
    }

    #[test]
    fn test_memory_cap() {
        let mut big = Graph::new();
        for i in 0..50_000 {
            big.add_node(i);
        }
        let snap = big.snapshot();
        let cfg = GraphConfig::default().with_max_memory_mb(1);

        let mut g = make_small();
        let err = g.restore_with(snap.clone(), &cfg).unwrap_err();
        assert!(matches!(err, GraphError::MemoryLimitExceeded { limit_mb: 1, .. }));
        assert_eq!(g, make_small());

        g.restore_with(snap, &GraphConfig::default().with_max_memory_mb(1024)).unwrap();
        assert_eq!(g.node_count(), 50_000);
    }
}
