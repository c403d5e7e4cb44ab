use std::collections::VecDeque;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wgraph_core::{Graph, NodeId, Result, UNREACHABLE};

/// Time wgraph-core on large synthetic weighted graphs.
#[derive(Debug, Parser)]
#[command(name = "wgraph-bench")]
struct Args {
    /// Topology to generate.
    #[arg(value_enum, default_value_t = Mode::All, env = "WGRAPH_BENCH_MODE")]
    mode: Mode,

    /// Target node count.
    #[arg(default_value_t = 1_000_000, env = "WGRAPH_BENCH_NODES")]
    node_count: u64,

    /// Seed mixed into every generator.
    #[arg(long, default_value_t = 0, env = "WGRAPH_BENCH_SEED")]
    seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Run all generators and benchmark each
    All,
    /// Fractal branching tree (deep paths)
    Lsystem,
    /// Preferential attachment via edge sampling (hub-and-spoke)
    Scalefree,
    /// Watts-Strogatz ring lattice + shortcuts
    Smallworld,
    /// Erdos-Renyi uniform random edges
    Random,
    /// Two dense cliques connected by a thin bridge
    Barbell,
    /// Diffusion-limited aggregation (organic branching)
    Dla,
}

type Generator = fn(u64, &mut FastRng) -> Result<Graph>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("wgraph-bench");
    println!("============");
    println!();

    let generators: Vec<(&str, Generator)> = match args.mode {
        Mode::Lsystem => vec![("L-system tree", gen_lsystem)],
        Mode::Scalefree => vec![("Scale-free (edge sampling)", gen_scale_free)],
        Mode::Smallworld => vec![("Small-world (Watts-Strogatz)", gen_small_world)],
        Mode::Random => vec![("Erdos-Renyi random", gen_random)],
        Mode::Barbell => vec![("Barbell (clique-bridge-clique)", gen_barbell)],
        Mode::Dla => vec![("DLA (organic branching)", gen_dla)],
        Mode::All => vec![
            ("L-system tree", gen_lsystem as Generator),
            ("Scale-free (edge sampling)", gen_scale_free),
            ("Small-world (Watts-Strogatz)", gen_small_world),
            ("Erdos-Renyi random", gen_random),
            ("Barbell (clique-bridge-clique)", gen_barbell),
            ("DLA (organic branching)", gen_dla),
        ],
    };

    for (i, (name, generator)) in generators.into_iter().enumerate() {
        let mut rng = FastRng::new(args.seed.wrapping_add(i as u64 * 7919));
        if let Err(err) = run_benchmark(name, generator, args.node_count, &mut rng) {
            warn!(generator = name, error = %err, "benchmark aborted");
        }
    }
}

fn run_benchmark(name: &str, generator: Generator, node_count: u64, rng: &mut FastRng) -> Result<()> {
    println!("--- {} ---", name);
    println!("Target: {} nodes", node_count);

    let t = Instant::now();
    let graph = generator(node_count, rng)?;
    let gen_time = t.elapsed();
    println!(
        "Generated in {:.2}s: {} nodes, {} edges, ~{:.0}MB, {} modifications",
        gen_time.as_secs_f64(),
        graph.node_count(),
        graph.edge_count(),
        graph.memory_usage() as f64 / 1_048_576.0,
        graph.mod_count()
    );

    let t = Instant::now();
    let connected = wgraph_core::is_connected(&graph);
    println!(
        "Connected: {} ({:.1}ms)",
        connected,
        t.elapsed().as_secs_f64() * 1000.0
    );

    // Weighted neighborhoods around node 0 (typically a hub or root)
    println!();
    println!("{:>8} {:>12} {:>10}", "radius", "found", "time");
    println!("{:->8} {:->12} {:->10}", "", "", "");

    for radius in [0.5, 1.0, 2.0, 5.0, 10.0, 25.0] {
        let t = Instant::now();
        let found = wgraph_core::neighborhood(&graph, 0, radius)?;
        let elapsed = t.elapsed();
        println!(
            "{:>8.1} {:>12} {:>8.1}ms",
            radius,
            found.len(),
            elapsed.as_secs_f64() * 1000.0
        );
        // Stop if we already found everything
        if found.len() + 1 >= graph.node_count() {
            println!("{:>8} (entire graph reached)", "");
            break;
        }
    }

    // Shortest path: node 0 to last node
    let far_node = graph.node_count() as NodeId - 1;
    println!();
    let t = Instant::now();
    let dist = wgraph_core::shortest_path_distance(&graph, 0, far_node)?;
    let path = wgraph_core::shortest_path(&graph, 0, far_node)?;
    let elapsed = t.elapsed();
    match path {
        Some(p) if dist != UNREACHABLE => println!(
            "Shortest path 0 → {}: distance {:.3}, {} hops in {:.1}ms",
            far_node,
            dist,
            p.len() - 1,
            elapsed.as_secs_f64() * 1000.0
        ),
        _ => println!(
            "Shortest path 0 → {}: no path ({:.1}ms)",
            far_node,
            elapsed.as_secs_f64() * 1000.0
        ),
    }

    let t = Instant::now();
    let top = wgraph_core::degree_centrality(&graph, 5);
    println!(
        "Top degrees: {} ({:.1}ms)",
        top.iter()
            .map(|d| format!("{}:{}", d.node_id, d.degree))
            .collect::<Vec<_>>()
            .join(", "),
        t.elapsed().as_secs_f64() * 1000.0
    );

    let t = Instant::now();
    let mut buf = Vec::new();
    graph.write_to(&mut buf)?;
    let encode = t.elapsed();
    let t = Instant::now();
    let mut restored = Graph::new();
    restored.read_from(buf.as_slice())?;
    println!(
        "Snapshot: {:.1}MB, encode {:.1}ms, restore {:.1}ms, equal={}",
        buf.len() as f64 / 1_048_576.0,
        encode.as_secs_f64() * 1000.0,
        t.elapsed().as_secs_f64() * 1000.0,
        restored == graph
    );
    info!(generator = name, "benchmark finished");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Generators: all O(n) or O(n + edges), single-threaded, deterministic
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
    /// Edge weight in [0.1, 10).
    fn weight(&mut self) -> f64 {
        0.1 + self.next_f64() * 9.9
    }
}

fn with_nodes(node_count: u64) -> Graph {
    let mut graph = Graph::with_capacity(node_count as usize);
    for i in 0..node_count as NodeId {
        graph.add_node(i);
    }
    graph
}

/// L-system fractal tree: deep branching with self-similar structure.
///
/// Each node spawns `branching` children. Produces deep paths (log depth)
/// with exponential width. Tests deep relaxation and path reconstruction.
fn gen_lsystem(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let mut graph = with_nodes(node_count);
    let branching = 3;

    let mut next_id: NodeId = 1;
    let mut frontier: Vec<NodeId> = vec![0];
    let limit = node_count as NodeId;

    while next_id < limit && !frontier.is_empty() {
        let mut next_frontier = Vec::with_capacity(frontier.len() * branching);
        for &parent in &frontier {
            for _ in 0..branching {
                if next_id >= limit {
                    break;
                }
                let child = next_id;
                next_id += 1;
                graph.connect(parent, child, rng.weight())?;
                next_frontier.push(child);
            }
        }
        frontier = next_frontier;
    }

    Ok(graph)
}

/// Scale-free via edge-list sampling (O(edges), not O(n²)).
///
/// Preferential attachment by picking a random existing edge endpoint.
/// Nodes with more edges are more likely to be picked.
fn gen_scale_free(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let edges_per_node = 10u64;
    let mut graph = with_nodes(node_count);
    let seed = 5u64.min(node_count);

    // Edge list for O(1) preferential attachment sampling
    let mut edge_endpoints: Vec<NodeId> = Vec::with_capacity((node_count * edges_per_node * 2) as usize);

    // Seed: small clique
    for i in 0..seed as NodeId {
        for j in (i + 1)..seed as NodeId {
            graph.connect(i, j, rng.weight())?;
            edge_endpoints.push(i);
            edge_endpoints.push(j);
        }
    }

    // Grow: each new node attaches to `edges_per_node` existing nodes
    for new_node in seed..node_count {
        let attach = edges_per_node.min(new_node);
        for _ in 0..attach {
            let idx = rng.next(edge_endpoints.len() as u64) as usize;
            let target = edge_endpoints[idx];
            graph.connect(new_node as NodeId, target, rng.weight())?;
            edge_endpoints.push(new_node as NodeId);
            edge_endpoints.push(target);
        }
    }

    Ok(graph)
}

/// Small-world (Watts-Strogatz): ring lattice + random rewiring.
///
/// Each node connects to its K nearest ring neighbors, and each of those
/// edges is rewired with probability p. High clustering, short paths.
fn gen_small_world(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let k = 5u64; // neighbors on each side
    let p = 0.05f64; // rewire probability
    let mut graph = with_nodes(node_count);

    for i in 0..node_count {
        for j in 1..=k {
            let mut target = (i + j) % node_count;
            if rng.next_f64() < p {
                target = rng.next(node_count);
            }
            // connect() ignores self-edges from small rings or rewiring
            graph.connect(i as NodeId, target as NodeId, rng.weight())?;
        }
    }

    Ok(graph)
}

/// Erdos-Renyi: uniform random edges, ~10 per node on average (degree ~10).
fn gen_random(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let target_edges = node_count * 5;
    let mut graph = with_nodes(node_count);

    for _ in 0..target_edges {
        let from = rng.next(node_count) as NodeId;
        let to = rng.next(node_count) as NodeId;
        graph.connect(from, to, rng.weight())?;
    }

    Ok(graph)
}

/// Barbell: two dense clusters connected by a thin bridge.
///
/// Worst case for "find path through bottleneck". Each cluster has ~n/2
/// nodes with ~10 random intra-cluster edges each; a chain of bridge nodes
/// joins them.
fn gen_barbell(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let bridge_len = 10u64.min(node_count);
    let clique_size = (node_count - bridge_len) / 2;
    let mut graph = with_nodes(node_count);

    let wire_cluster = |graph: &mut Graph, base: u64, rng: &mut FastRng| -> Result<()> {
        for i in 0..clique_size {
            for _ in 0..10u64.min(clique_size.saturating_sub(1)) {
                let target = rng.next(clique_size);
                graph.connect((base + i) as NodeId, (base + target) as NodeId, rng.weight())?;
            }
        }
        Ok(())
    };

    // Cluster A: nodes 0..clique_size
    wire_cluster(&mut graph, 0, rng)?;

    // Bridge: chain from last node of A through the bridge nodes
    for i in 0..bridge_len {
        let id = clique_size + i;
        if id > 0 {
            graph.connect(id as NodeId - 1, id as NodeId, rng.weight())?;
        }
    }

    // Cluster B: everything after the bridge, joined to the bridge's end
    let b_start = clique_size + bridge_len;
    if b_start > 0 && b_start < node_count {
        graph.connect(b_start as NodeId - 1, b_start as NodeId, rng.weight())?;
    }
    wire_cluster(&mut graph, b_start, rng)?;

    Ok(graph)
}

/// DLA (Diffusion-Limited Aggregation): organic branching growth.
///
/// Each new node attaches to a random node on a sliding "surface" of recent
/// additions, with an occasional long-range jump that closes a loop.
fn gen_dla(node_count: u64, rng: &mut FastRng) -> Result<Graph> {
    let mut graph = with_nodes(node_count);

    // VecDeque for O(1) pop_front when evicting oldest surface nodes.
    let surface_max = 10000usize;
    let mut surface: VecDeque<NodeId> = VecDeque::with_capacity(surface_max + 1);
    surface.push_back(0);

    for new_node in 1..node_count as NodeId {
        let attach_to = surface[rng.next(surface.len() as u64) as usize];
        graph.connect(new_node, attach_to, rng.weight())?;

        // 10% chance of a second connection (creates loops / shortcuts)
        if rng.next(10) == 0 && new_node > 1 {
            let other = rng.next(new_node as u64) as NodeId;
            graph.connect(new_node, other, rng.weight())?;
        }

        surface.push_back(new_node);
        if surface.len() > surface_max {
            surface.pop_front();
        }
    }

    Ok(graph)
}
