use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};

/// Caller-assigned node key.
pub type NodeId = i64;

/// Returned by [`Graph::edge_weight`] when the two nodes are not adjacent.
pub const NO_EDGE: f64 = -1.0;

/// A node and its adjacency.
///
/// The adjacency is a single neighbor → weight map: neighbor enumeration and
/// O(1) weight lookup read the same structure, so they cannot disagree.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    key: NodeId,
    info: String,
    edges: HashMap<NodeId, f64>,
}

impl NodeInfo {
    fn new(key: NodeId) -> Self {
        Self {
            key,
            info: String::new(),
            edges: HashMap::new(),
        }
    }

    pub fn key(&self) -> NodeId {
        self.key
    }

    /// Free-form annotation. Not used by any algorithm.
    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    /// `(neighbor, weight)` pairs in arbitrary order.
    pub fn neighbors(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.edges.iter().map(|(&id, &w)| (id, w))
    }

    pub fn weight_to(&self, other: NodeId) -> Option<f64> {
        self.edges.get(&other).copied()
    }
}

/// One undirected edge, smaller key first when produced by [`Graph::edges`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

/// In-memory undirected weighted graph.
///
/// Every edge (a, b, w) lives in both `a`'s and `b`'s adjacency with the same
/// weight. `edge_count` is kept in step with inserts/removals and `mod_count`
/// is bumped once per state change; no-ops leave both untouched.
#[derive(Debug)]
pub struct Graph {
    nodes: HashMap<NodeId, NodeInfo>,
    edge_count: usize,
    mod_count: u64,
}

fn check_weight(from: NodeId, to: NodeId, weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidWeight { from, to, weight })
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edge_count: 0,
            mod_count: 0,
        }
    }

    /// Pre-allocate for a known node count.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(node_count),
            edge_count: 0,
            mod_count: 0,
        }
    }

    pub fn with_config(config: &GraphConfig) -> Self {
        Self::with_capacity(config.node_capacity)
    }

    /// Insert a node with no edges. Re-adding an existing key does nothing.
    pub fn add_node(&mut self, key: NodeId) {
        if self.nodes.contains_key(&key) {
            return;
        }
        self.nodes.insert(key, NodeInfo::new(key));
        self.mod_count += 1;
    }

    /// Remove a node and every edge touching it.
    ///
    /// Bumps the modification counter once per removed edge plus once for
    /// the node. Returns the removed node, or None if the key was absent.
    pub fn remove_node(&mut self, key: NodeId) -> Option<NodeInfo> {
        let node = self.nodes.remove(&key)?;
        for other in node.edges.keys() {
            if let Some(n) = self.nodes.get_mut(other) {
                n.edges.remove(&key);
            }
            self.mod_count += 1;
        }
        self.edge_count -= node.degree();
        self.mod_count += 1;
        debug!(node = key, removed_edges = node.degree(), "removed node");
        Some(node)
    }

    /// Connect `a` and `b` with weight `weight`, or update the weight of an
    /// existing edge.
    ///
    /// Both endpoints must exist and the weight must be finite and
    /// non-negative. `a == b` is accepted and ignored (no self-loops), as is
    /// reconnecting with the weight already stored.
    pub fn connect(&mut self, a: NodeId, b: NodeId, weight: f64) -> Result<()> {
        self.require(a)?;
        self.require(b)?;
        check_weight(a, b, weight)?;
        if a == b {
            return Ok(());
        }

        match self.weight_between(a, b) {
            Some(current) if current == weight => return Ok(()),
            Some(_) => {}
            None => self.edge_count += 1,
        }

        // Both endpoints verified above: both sides are written or neither.
        if let Some(n) = self.nodes.get_mut(&a) {
            n.edges.insert(b, weight);
        }
        if let Some(n) = self.nodes.get_mut(&b) {
            n.edges.insert(a, weight);
        }
        self.mod_count += 1;
        Ok(())
    }

    /// Remove the edge between `a` and `b`. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.require(a)?;
        self.require(b)?;
        if a == b || self.weight_between(a, b).is_none() {
            return Ok(false);
        }

        if let Some(n) = self.nodes.get_mut(&a) {
            n.edges.remove(&b);
        }
        if let Some(n) = self.nodes.get_mut(&b) {
            n.edges.remove(&a);
        }
        self.edge_count -= 1;
        self.mod_count += 1;
        Ok(true)
    }

    /// True iff both nodes exist and share an edge.
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.weight_between(a, b).is_some()
    }

    /// Weight of the edge (a, b).
    ///
    /// 0 when `a == b` (self-distance), [`NO_EDGE`] when the nodes are not
    /// adjacent. Fails if either node is absent.
    pub fn edge_weight(&self, a: NodeId, b: NodeId) -> Result<f64> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Ok(0.0);
        }
        Ok(self.weight_between(a, b).unwrap_or(NO_EDGE))
    }

    /// Like [`edge_weight`](Self::edge_weight) but with `None` for both a
    /// missing edge and a missing node.
    pub fn weight(&self, a: NodeId, b: NodeId) -> Option<f64> {
        if a == b {
            return self.nodes.contains_key(&a).then_some(0.0);
        }
        self.weight_between(a, b)
    }

    /// `(neighbor, weight)` pairs adjacent to `key`.
    pub fn neighbors(&self, key: NodeId) -> Result<impl Iterator<Item = (NodeId, f64)> + '_> {
        self.nodes
            .get(&key)
            .map(NodeInfo::neighbors)
            .ok_or(GraphError::NodeNotFound(key))
    }

    /// Number of edges at `key`; 0 if absent.
    pub fn degree(&self, key: NodeId) -> usize {
        self.nodes.get(&key).map_or(0, NodeInfo::degree)
    }

    pub fn node(&self, key: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(&key)
    }

    pub fn node_mut(&mut self, key: NodeId) -> Option<&mut NodeInfo> {
        self.nodes.get_mut(&key)
    }

    pub fn contains_node(&self, key: NodeId) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Every node, in arbitrary order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Every undirected edge exactly once, `from < to`.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRecord> + '_ {
        self.nodes.values().flat_map(|n| {
            n.edges
                .iter()
                .filter(move |(&to, _)| n.key < to)
                .map(move |(&to, &weight)| EdgeRecord {
                    from: n.key,
                    to,
                    weight,
                })
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of state-changing operations applied so far.
    pub fn mod_count(&self) -> u64 {
        self.mod_count
    }

    pub(crate) fn set_mod_count(&mut self, mod_count: u64) {
        self.mod_count = mod_count;
    }

    /// Independent deep copy, rebuilt through `add_node` / `connect`.
    ///
    /// The copy's modification counter counts the rebuild, not the history
    /// of `self`.
    pub fn copy(&self) -> Graph {
        let mut copy = Graph::with_capacity(self.node_count());
        for node in self.nodes() {
            copy.add_node(node.key);
            if !node.info.is_empty() {
                if let Some(n) = copy.node_mut(node.key) {
                    n.set_info(node.info.clone());
                }
            }
        }
        // Every endpoint was added above and every weight already passed
        // check_weight on insert into `self`, so connect cannot fail here.
        for e in self.edges() {
            let res = copy.connect(e.from, e.to, e.weight);
            debug_assert!(res.is_ok(), "copying a valid edge failed: {res:?}");
        }
        copy
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        estimate_memory(self.nodes.len(), self.edge_count)
    }

    fn require(&self, key: NodeId) -> Result<()> {
        if self.nodes.contains_key(&key) {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(key))
        }
    }

    fn weight_between(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.nodes.get(&a).and_then(|n| n.weight_to(b))
    }
}

/// Footprint estimate shared by [`Graph::memory_usage`] and the restore cap.
pub(crate) fn estimate_memory(node_count: usize, edge_count: usize) -> usize {
    use std::mem::size_of;

    let node_mem = node_count * (size_of::<NodeId>() + size_of::<NodeInfo>() + 16);
    // Each edge is stored twice, once per endpoint.
    let edge_mem = edge_count * 2 * (size_of::<NodeId>() + size_of::<f64>() + 8);
    node_mem + edge_mem
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Same node keys, same edges, same weights. The modification counter and
/// node annotations do not take part.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self.edge_count == other.edge_count
            && self.nodes.iter().all(|(key, node)| {
                other
                    .nodes
                    .get(key)
                    .is_some_and(|theirs| theirs.edges == node.edges)
            })
    }
}

// Weights are validated finite on insert, so equality is reflexive.
impl Eq for Graph {}
