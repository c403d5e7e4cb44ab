use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{Graph, NodeId};
use crate::traversal;

/// A graph plus the algorithms that run over it.
///
/// Owns its graph; callers mutate it through [`graph_mut`](Self::graph_mut)
/// and query it through the methods here.
#[derive(Debug, Default)]
pub struct GraphAlgo {
    graph: Graph,
    config: GraphConfig,
}

impl GraphAlgo {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            config: GraphConfig::default(),
        }
    }

    /// Empty graph pre-sized from `config`; `config` also governs [`load`](Self::load).
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            graph: Graph::with_config(&config),
            config,
        }
    }

    /// Swap in a new graph, returning the previous one.
    pub fn init(&mut self, graph: Graph) -> Graph {
        std::mem::replace(&mut self.graph, graph)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Deep copy of the owned graph.
    pub fn copy(&self) -> Graph {
        self.graph.copy()
    }

    pub fn is_connected(&self) -> bool {
        traversal::is_connected(&self.graph)
    }

    /// See [`traversal::shortest_path_distance`].
    pub fn shortest_path_dist(&self, src: NodeId, dest: NodeId) -> Result<f64> {
        traversal::shortest_path_distance(&self.graph, src, dest)
    }

    /// See [`traversal::shortest_path`].
    pub fn shortest_path(&self, src: NodeId, dest: NodeId) -> Result<Option<Vec<NodeId>>> {
        traversal::shortest_path(&self.graph, src, dest)
    }

    /// Write the graph to `path` as a JSON snapshot.
    ///
    /// The snapshot goes to a sibling temp file first and is renamed into
    /// place, so an existing file at `path` survives a failed save.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = tmp_path(path);

        if let Err(err) = write_snapshot(&self.graph, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!(
            path = %path.display(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "saved graph"
        );
        Ok(())
    }

    /// Replace the graph with the snapshot stored at `path`.
    ///
    /// On any error (missing file, bad JSON, invalid graph, memory cap) the
    /// current graph is kept.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.graph.read_from_with(BufReader::new(file), &self.config)?;
        debug!(
            path = %path.display(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "loaded graph"
        );
        Ok(())
    }
}

fn write_snapshot(graph: &Graph, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    graph.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("graph"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::traversal::UNREACHABLE;

    /// Deterministic pseudo-random graph with exactly `edges` edges.
    fn make_random(nodes: NodeId, edges: usize, seed: u64) -> Graph {
        let mut state = seed;
        let mut next = |max: u64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 33) % max
        };

        let mut g = Graph::new();
        for i in 0..nodes {
            g.add_node(i);
        }
        while g.edge_count() < edges {
            let a = next(nodes as u64) as NodeId;
            let b = next(nodes as u64) as NodeId;
            let w = next(1000) as f64 / 1000.0;
            g.connect(a, b, w).unwrap();
        }
        g
    }

    fn make_partition() -> Graph {
        let mut g = Graph::new();
        for i in 1..=4 {
            g.add_node(i);
        }
        g.connect(1, 2, 2.0).unwrap();
        g.connect(1, 3, 6.0).unwrap();
        g.connect(2, 4, 4.5).unwrap();
        g
    }

    #[test]
    fn test_is_connected_through_graph_mut() {
        let mut algo = GraphAlgo::new(make_partition());
        assert!(algo.is_connected());
        algo.graph_mut().remove_node(1);
        assert!(!algo.is_connected());
        algo.graph_mut().connect(2, 3, 13.0).unwrap();
        assert!(algo.is_connected());
    }

    #[test]
    fn test_queries() {
        let algo = GraphAlgo::new(make_partition());
        assert_eq!(algo.shortest_path_dist(3, 4).unwrap(), 12.5);
        assert_eq!(algo.shortest_path(3, 4).unwrap(), Some(vec![3, 1, 2, 4]));
        assert!(matches!(algo.shortest_path_dist(3, 9), Err(GraphError::NodeNotFound(9))));
    }

    #[test]
    fn test_unreachable_after_removal() {
        let mut algo = GraphAlgo::new(make_partition());
        algo.graph_mut().remove_edge(1, 3).unwrap();
        assert_eq!(algo.shortest_path_dist(3, 4).unwrap(), UNREACHABLE);
        assert_eq!(algo.shortest_path(3, 4).unwrap(), None);
    }

    #[test]
    fn test_init_swaps_graph() {
        let mut algo = GraphAlgo::default();
        assert!(algo.is_connected());
        let old = algo.init(make_partition());
        assert_eq!(old.node_count(), 0);
        assert_eq!(algo.graph().node_count(), 4);
    }

    #[test]
    fn test_copy_independent() {
        let algo = GraphAlgo::new(make_random(10, 23, 1));
        let mut c = algo.copy();
        assert_eq!(&c, algo.graph());
        c.remove_node(7);
        assert_ne!(&c, algo.graph());
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g0.json");

        let mut algo = GraphAlgo::new(make_random(10, 23, 1));
        algo.save(&path).unwrap();

        algo.graph_mut().remove_node(7);
        assert_ne!(algo.graph(), &make_random(10, 23, 1));

        algo.load(&path).unwrap();
        assert_eq!(algo.graph(), &make_random(10, 23, 1));
        assert!(!dir.path().join("g0.json.tmp").exists());
    }

    #[test]
    fn test_load_missing_file_keeps_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut algo = GraphAlgo::new(make_partition());
        let err = algo.load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GraphError::Io(_)));
        assert_eq!(algo.graph(), &make_partition());
    }

    #[test]
    fn test_load_corrupt_file_keeps_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"[1, 2, 3]").unwrap();

        let mut algo = GraphAlgo::new(make_partition());
        assert!(algo.load(&path).is_err());
        assert_eq!(algo.graph(), &make_partition());
        assert_eq!(algo.graph().mod_count(), make_partition().mod_count());
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let algo = GraphAlgo::new(make_partition());
        assert!(algo.save(dir.path().join("missing").join("g.json")).is_err());
    }

    #[test]
    fn test_failed_rename_removes_tmp() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target makes the final rename fail.
        let target = dir.path().join("taken");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let algo = GraphAlgo::new(make_partition());
        assert!(matches!(algo.save(&target), Err(GraphError::Io(_))));
        assert!(!dir.path().join("taken.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_save_load_fractional_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frac.json");

        let mut g = Graph::new();
        let mut state = 42u64;
        for i in 0..2000 {
            g.add_node(i);
            if i > 0 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let f = (state >> 11) as f64 / (1u64 << 53) as f64;
                g.connect(i - 1, i, 0.1 + f * 9.9).unwrap();
            }
        }
        let mut algo = GraphAlgo::new(g.copy());
        algo.save(&path).unwrap();
        algo.graph_mut().remove_node(0);
        algo.load(&path).unwrap();

        for e in g.edges() {
            assert_eq!(algo.graph().weight(e.from, e.to).unwrap().to_bits(), e.weight.to_bits());
        }
        assert_eq!(algo.graph(), &g);
    }

    #[test]
    fn test_load_respects_memory_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let mut big = Graph::new();
        for i in 0..50_000 {
            big.add_node(i);
        }
        GraphAlgo::new(big).save(&path).unwrap();

        let mut algo = GraphAlgo::with_config(GraphConfig::default().with_max_memory_mb(1));
        algo.graph_mut().add_node(1);
        assert!(matches!(
            algo.load(&path),
            Err(GraphError::MemoryLimitExceeded { .. })
        ));
        assert_eq!(algo.graph().node_count(), 1);
    }
}
