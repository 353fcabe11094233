//! chunkmesh integration test harness.
//!
//! Tests here drive the public API of both crates together: chunk a
//! source, route across a topology, simulate the transfer, record it.
//! Nothing touches the network; everything runs in-process.

use anyhow::{Context, Result};
use chunkmesh_core::{Connection, LinkKind, Node, Topology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod end_to_end;
mod routing;
mod snapshot;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Three nodes in a line: a wired hop then a lossy wireless hop.
pub fn sample_topology() -> Result<Topology> {
    let mut t = Topology::new();
    t.add_node(Node::new("node-1", "Node A"))?;
    t.add_node(Node::new("node-2", "Node B"))?;
    t.add_node(Node::new("node-3", "Node C"))?;
    t.add_connection(
        Connection::new("conn-1", "node-1", "node-2", 10.0, 100.0).with_distance(100.0),
    )?;
    t.add_connection(
        Connection::new("conn-2", "node-2", "node-3", 20.0, 50.0)
            .with_kind(LinkKind::Wireless)
            .with_packet_loss(0.05)
            .with_distance(150.0),
    )?;
    Ok(t)
}

/// A grid-ish mesh with a slow shortcut, for routing tests.
pub fn mesh_topology() -> Result<Topology> {
    let mut t = Topology::new();
    for id in ["a", "b", "c", "d", "e"] {
        t.add_node(Node::new(id, format!("Node {}", id.to_uppercase())))?;
    }
    let links = [
        ("ab", "a", "b", 5.0, 10_000.0),
        ("bc", "b", "c", 5.0, 10_000.0),
        ("cd", "c", "d", 5.0, 10_000.0),
        ("ae", "a", "e", 2.0, 100.0),
        ("ed", "e", "d", 2.0, 100.0),
        ("ad", "a", "d", 40.0, 1_000_000.0),
    ];
    for (id, s, d, lat, bw) in links {
        t.add_connection(Connection::new(id, s, d, lat, bw))
            .with_context(|| format!("adding {id}"))?;
    }
    Ok(t)
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
