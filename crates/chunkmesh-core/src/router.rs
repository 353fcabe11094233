//! Router — least-cost paths over a `Topology` with Dijkstra's algorithm.
//!
//! The cost of a hop comes from a caller-supplied weight function, which
//! must never return a negative value. The default metric is
//! `latency_ms + 1000 / bandwidth_kbps`, a routing heuristic that is
//! deliberately independent of the timing model in the cost estimator.
//!
//! Ties between equal tentative distances are broken by the order in which
//! entries were pushed onto the frontier, which follows connection
//! insertion order. Results are therefore reproducible for a fixed topology
//! and weight function.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::topology::{Connection, Topology};

/// Named link-cost metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `latency_ms + 1000 / bandwidth_kbps`
    #[default]
    LatencyBandwidth,
    /// `latency_ms`
    Latency,
    /// `1000 / bandwidth_kbps`
    InverseBandwidth,
    /// Latency-bandwidth cost scaled by `1 / (1 - packet_loss)`; a link that
    /// drops everything is unusable.
    LossPenalized,
}

impl Metric {
    pub fn weight(self, c: &Connection) -> f64 {
        match self {
            Metric::LatencyBandwidth => default_weight(c),
            Metric::Latency => c.latency_ms,
            Metric::InverseBandwidth => 1000.0 / c.bandwidth_kbps,
            Metric::LossPenalized => {
                if c.packet_loss >= 1.0 {
                    f64::INFINITY
                } else {
                    default_weight(c) / (1.0 - c.packet_loss)
                }
            }
        }
    }

    pub fn as_fn(self) -> impl Fn(&Connection) -> f64 {
        move |c: &Connection| self.weight(c)
    }
}

impl std::str::FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latency_bandwidth" => Ok(Metric::LatencyBandwidth),
            "latency" => Ok(Metric::Latency),
            "inverse_bandwidth" => Ok(Metric::InverseBandwidth),
            "loss_penalized" => Ok(Metric::LossPenalized),
            other => Err(Error::invalid(format!("unknown routing metric: {other}"))),
        }
    }
}

/// `latency_ms + 1000 / bandwidth_kbps`
pub fn default_weight(c: &Connection) -> f64 {
    c.latency_ms + 1000.0 / c.bandwidth_kbps
}

/// A route from start to goal. Empty means no path exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    nodes: Vec<String>,
    /// Connection used for each hop; `hops.len() == nodes.len() - 1`.
    hops: Vec<String>,
    cost: f64,
}

impl Path {
    /// Build a path from explicit node ids and the connection ids joining
    /// them, e.g. one chosen by a collaborator rather than the router.
    pub fn from_parts(nodes: Vec<String>, hops: Vec<String>, cost: f64) -> Result<Self> {
        if !nodes.is_empty() && hops.len() + 1 != nodes.len() {
            return Err(Error::invalid(format!(
                "path with {} nodes needs {} hops, got {}",
                nodes.len(),
                nodes.len() - 1,
                hops.len()
            )));
        }
        Ok(Self { nodes, hops, cost })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn hops(&self) -> &[String] {
        &self.hops
    }

    /// Sum of hop weights under the function the path was computed with.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Frontier entry. Ordered so that `BinaryHeap` pops the smallest distance
/// first, and the earliest-pushed entry among equals.
#[derive(Debug)]
struct Frontier {
    dist: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Least-cost path from `start` to `goal` using the default metric.
pub fn shortest_path_default(topology: &Topology, start: &str, goal: &str) -> Result<Path> {
    shortest_path(topology, start, goal, default_weight)
}

/// Least-cost path from `start` to `goal` under `weight`.
///
/// Every connection's weight is checked before the search starts; a
/// negative or NaN weight fails with `InvalidWeight`. An infinite weight
/// marks a link as unusable.
pub fn shortest_path<F>(topology: &Topology, start: &str, goal: &str, weight: F) -> Result<Path>
where
    F: Fn(&Connection) -> f64,
{
    for end in [start, goal] {
        if !topology.contains_node(end) {
            return Err(Error::UnknownNode(end.to_string()));
        }
    }

    let weights: HashMap<&str, f64> = topology
        .connections()
        .iter()
        .map(|c| {
            let w = weight(c);
            if w.is_nan() || w < 0.0 {
                Err(Error::InvalidWeight {
                    connection: c.id.clone(),
                    weight: w,
                })
            } else {
                Ok((c.id.as_str(), w))
            }
        })
        .collect::<Result<_>>()?;

    if start == goal {
        return Ok(Path {
            nodes: vec![start.to_string()],
            hops: Vec::new(),
            cost: 0.0,
        });
    }

    let ids: Vec<&str> = topology.nodes().iter().map(|n| n.id.as_str()).collect();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let (start_ix, goal_ix) = (index[start], index[goal]);

    let mut dist = vec![f64::INFINITY; ids.len()];
    // Predecessor node and the connection used to reach each node.
    let mut prev: Vec<Option<(usize, &str)>> = vec![None; ids.len()];
    let mut visited = HashSet::new();
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    dist[start_ix] = 0.0;
    frontier.push(Frontier {
        dist: 0.0,
        seq,
        node: start_ix,
    });

    while let Some(Frontier { dist: d, node, .. }) = frontier.pop() {
        if d.is_infinite() {
            break;
        }
        if !visited.insert(node) {
            continue;
        }
        if node == goal_ix {
            break;
        }

        for (neighbor, conn) in topology.neighbors(ids[node])? {
            let n = index[neighbor];
            if visited.contains(&n) {
                continue;
            }
            let candidate = d + weights[conn.id.as_str()];
            if candidate < dist[n] {
                dist[n] = candidate;
                prev[n] = Some((node, conn.id.as_str()));
                seq += 1;
                frontier.push(Frontier {
                    dist: candidate,
                    seq,
                    node: n,
                });
            }
        }
    }

    if dist[goal_ix].is_infinite() {
        tracing::debug!(start, goal, "no path");
        return Ok(Path::empty());
    }

    let mut nodes = vec![goal.to_string()];
    let mut hops = Vec::new();
    let mut cursor = goal_ix;
    while let Some((p, conn)) = prev[cursor] {
        hops.push(conn.to_string());
        nodes.push(ids[p].to_string());
        cursor = p;
    }
    nodes.reverse();
    hops.reverse();

    tracing::debug!(start, goal, hops = hops.len(), cost = dist[goal_ix], "path found");
    Ok(Path {
        nodes,
        hops,
        cost: dist[goal_ix],
    })
}
