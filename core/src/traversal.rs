use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::trace;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId};

/// Distance returned when no path exists.
pub const UNREACHABLE: f64 = -1.0;

/// Visitation state of a node during one relaxation run.
///
/// Transitions only go forward: Unvisited → Frontier → Finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Unvisited,
    Frontier,
    Finalized,
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    label: f64,
    hops: u32,
    marker: Marker,
    predecessor: Option<NodeId>,
}

impl NodeState {
    const UNVISITED: NodeState = NodeState {
        label: f64::INFINITY,
        hops: 0,
        marker: Marker::Unvisited,
        predecessor: None,
    };
}

/// Min-heap entry keyed on tentative distance; ties pop the smaller key first.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrontierEntry(f64, NodeId);

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0).then_with(|| other.1.cmp(&self.1))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-query scratch state of a single-source relaxation.
///
/// Owned by the query, never stored on the graph: any number of
/// `Relaxation`s over the same `&Graph` can coexist.
#[derive(Debug)]
pub struct Relaxation {
    source: NodeId,
    states: HashMap<NodeId, NodeState>,
    reached: usize,
}

impl Relaxation {
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Shortest distance from the source, None if not reached.
    pub fn distance(&self, key: NodeId) -> Option<f64> {
        self.states
            .get(&key)
            .map(|s| s.label)
            .filter(|d| d.is_finite())
    }

    /// Edge count of the recorded shortest path, None if not reached.
    pub fn hops(&self, key: NodeId) -> Option<u32> {
        self.states
            .get(&key)
            .filter(|s| s.label.is_finite())
            .map(|s| s.hops)
    }

    pub fn marker(&self, key: NodeId) -> Marker {
        self.states.get(&key).map_or(Marker::Unvisited, |s| s.marker)
    }

    /// Node preceding `key` on its shortest path. None for the source and
    /// for nodes never reached.
    pub fn predecessor(&self, key: NodeId) -> Option<NodeId> {
        self.states.get(&key).and_then(|s| s.predecessor)
    }

    /// Number of finalized nodes, source included.
    pub fn reached(&self) -> usize {
        self.reached
    }

    /// Walk predecessor links from `dest` back to the source.
    ///
    /// Gives up after `node_count` steps, so a corrupted predecessor chain
    /// cannot loop forever.
    pub fn path_to(&self, dest: NodeId) -> Option<Vec<NodeId>> {
        if !self.states.contains_key(&dest) {
            return None;
        }

        let mut path = vec![dest];
        let mut current = dest;
        for _ in 0..self.states.len() {
            if current == self.source {
                break;
            }
            current = self.predecessor(current)?;
            path.push(current);
        }

        if current != self.source {
            return None;
        }
        path.reverse();
        Some(path)
    }
}

/// Where a relaxation run may stop early.
#[derive(Debug, Clone, Copy, Default)]
struct Limits {
    /// Stop as soon as this node is finalized.
    target: Option<NodeId>,
    /// Never label a node farther than this.
    radius: Option<f64>,
}

/// Dijkstra from `source` over the whole graph.
///
/// Every node gets a state entry, reachable or not. Fails if `source` is
/// absent.
pub fn relax(graph: &Graph, source: NodeId) -> Result<Relaxation> {
    if !graph.contains_node(source) {
        return Err(GraphError::NodeNotFound(source));
    }
    Ok(run(graph, source, Limits::default()))
}

fn run(graph: &Graph, source: NodeId, limits: Limits) -> Relaxation {
    let mut states: HashMap<NodeId, NodeState> = graph
        .node_ids()
        .map(|id| (id, NodeState::UNVISITED))
        .collect();
    let mut frontier = BinaryHeap::new();
    let mut reached = 0usize;
    let mut pushes = 0usize;

    states.insert(
        source,
        NodeState {
            label: 0.0,
            hops: 0,
            marker: Marker::Frontier,
            predecessor: None,
        },
    );
    frontier.push(FrontierEntry(0.0, source));

    while let Some(FrontierEntry(dist, u)) = frontier.pop() {
        let hops = match states.get_mut(&u) {
            // Stale heap entry: u was finalized or improved after this push.
            Some(s) if s.marker == Marker::Finalized || dist > s.label => continue,
            Some(s) => {
                s.marker = Marker::Finalized;
                s.hops
            }
            None => continue,
        };
        reached += 1;

        if limits.target == Some(u) {
            break;
        }

        let Some(node) = graph.node(u) else { continue };
        for (v, w) in node.neighbors() {
            let candidate = dist + w;
            if limits.radius.is_some_and(|r| candidate > r) {
                continue;
            }
            let Some(s) = states.get_mut(&v) else { continue };
            if s.marker == Marker::Finalized || candidate >= s.label {
                continue;
            }
            s.label = candidate;
            s.hops = hops + 1;
            s.predecessor = Some(u);
            s.marker = Marker::Frontier;
            frontier.push(FrontierEntry(candidate, v));
            pushes += 1;
        }
    }

    trace!(source, reached, pushes, "relaxation finished");
    Relaxation {
        source,
        states,
        reached,
    }
}

/// True iff every node is reachable from every other node.
///
/// An empty graph counts as connected. One run from any node suffices since
/// edges are undirected.
pub fn is_connected(graph: &Graph) -> bool {
    let Some(start) = graph.node_ids().next() else {
        return true;
    };
    run(graph, start, Limits::default()).reached() == graph.node_count()
}

/// Length of the shortest weighted path from `src` to `dest`.
///
/// 0 when `src == dest`; [`UNREACHABLE`] when no path exists. Fails if either
/// node is absent.
pub fn shortest_path_distance(graph: &Graph, src: NodeId, dest: NodeId) -> Result<f64> {
    require_endpoints(graph, src, dest)?;
    if src == dest {
        return Ok(0.0);
    }
    if graph.degree(src) == 0 || graph.degree(dest) == 0 {
        return Ok(UNREACHABLE);
    }

    let relaxation = run(graph, src, Limits { target: Some(dest), radius: None });
    Ok(relaxation.distance(dest).unwrap_or(UNREACHABLE))
}

/// Shortest weighted path from `src` to `dest`, both endpoints included.
///
/// `Some(vec![dest])` when `src == dest`, None when no path exists. Fails if
/// either node is absent.
pub fn shortest_path(graph: &Graph, src: NodeId, dest: NodeId) -> Result<Option<Vec<NodeId>>> {
    require_endpoints(graph, src, dest)?;
    if src == dest {
        return Ok(Some(vec![dest]));
    }
    if graph.degree(src) == 0 || graph.degree(dest) == 0 {
        return Ok(None);
    }

    let relaxation = run(graph, src, Limits { target: Some(dest), radius: None });
    Ok(relaxation.path_to(dest))
}

fn require_endpoints(graph: &Graph, src: NodeId, dest: NodeId) -> Result<()> {
    for key in [src, dest] {
        if !graph.contains_node(key) {
            return Err(GraphError::NodeNotFound(key));
        }
    }
    Ok(())
}

/// A node found within the distance radius of a neighborhood query.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborResult {
    pub node_id: NodeId,
    pub distance: f64,
    /// Edges on the shortest path that produced `distance`.
    pub hops: u32,
}

/// Every node within weighted distance `max_distance` of `start`.
///
/// The start node itself is not returned. Results are sorted by distance,
/// then by key. Relaxation never labels past the radius, so the cost is
/// bounded by the size of the neighborhood rather than the graph.
pub fn neighborhood(graph: &Graph, start: NodeId, max_distance: f64) -> Result<Vec<NeighborResult>> {
    if !graph.contains_node(start) {
        return Err(GraphError::NodeNotFound(start));
    }
    // Also rejects NaN.
    if !(max_distance >= 0.0) {
        return Ok(Vec::new());
    }

    let relaxation = run(graph, start, Limits { target: None, radius: Some(max_distance) });
    let mut found: Vec<NeighborResult> = relaxation
        .states
        .iter()
        .filter(|(&id, s)| id != start && s.marker == Marker::Finalized)
        .map(|(&id, s)| NeighborResult {
            node_id: id,
            distance: s.label,
            hops: s.hops,
        })
        .collect();

    found.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.node_id.cmp(&b.node_id))
    });
    Ok(found)
}

/// Degree information for a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeResult {
    pub node_id: NodeId,
    pub degree: usize,
    /// Sum of the weights of all incident edges.
    pub total_weight: f64,
}

/// Nodes ranked by degree.
///
/// If `top_n` is 0, returns all nodes. Otherwise returns the top N by
/// degree (descending). Ties are broken by node key (ascending).
pub fn degree_centrality(graph: &Graph, top_n: usize) -> Vec<DegreeResult> {
    let mut results: Vec<DegreeResult> = graph
        .nodes()
        .map(|n| DegreeResult {
            node_id: n.key(),
            degree: n.degree(),
            total_weight: n.neighbors().map(|(_, w)| w).sum(),
        })
        .collect();

    results.sort_by(|a, b| b.degree.cmp(&a.degree).then(a.node_id.cmp(&b.node_id)));

    if top_n > 0 && top_n < results.len() {
        results.truncate(top_n);
    }

    results
}
