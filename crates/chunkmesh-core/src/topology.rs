//! Topology model — nodes and weighted links, owned in memory.
//!
//! A `Topology` is an explicit value handed to the router and simulator by
//! reference. There is no process-wide registry.
//!
//! Connections are undirected for neighbor lookup unless the topology was
//! built with `Topology::directed()`. Insertion order is preserved everywhere
//! so that routing tie-breaks are reproducible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot format version understood by `Topology::from_snapshot`.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Online,
    Offline,
    Transferring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            status: NodeStatus::Online,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Wired,
    Wireless,
}

/// A link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub latency_ms: f64,
    pub bandwidth_kbps: f64,
    pub packet_loss: f64,
    pub distance_meters: f64,
}

impl Connection {
    /// A wired, lossless link of zero length.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        latency_ms: f64,
        bandwidth_kbps: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: LinkKind::Wired,
            latency_ms,
            bandwidth_kbps,
            packet_loss: 0.0,
            distance_meters: 0.0,
        }
    }

    pub fn with_kind(mut self, kind: LinkKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_packet_loss(mut self, packet_loss: f64) -> Self {
        self.packet_loss = packet_loss;
        self
    }

    pub fn with_distance(mut self, distance_meters: f64) -> Self {
        self.distance_meters = distance_meters;
        self
    }

    /// The endpoint opposite `node`, if `node` is one of the endpoints.
    pub fn other_end(&self, node: &str) -> Option<&str> {
        if self.source == node {
            Some(&self.target)
        } else if self.target == node {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Check the link's own invariants. Endpoint existence is checked by
    /// the topology.
    pub fn validate(&self) -> Result<()> {
        if self.source == self.target {
            return Err(Error::invalid(format!(
                "connection {} links {} to itself",
                self.id, self.source
            )));
        }
        if !(self.latency_ms.is_finite() && self.latency_ms >= 0.0) {
            return Err(Error::invalid(format!(
                "connection {}: latency must be >= 0, got {}",
                self.id, self.latency_ms
            )));
        }
        if !(self.bandwidth_kbps.is_finite() && self.bandwidth_kbps > 0.0) {
            return Err(Error::invalid(format!(
                "connection {}: bandwidth must be > 0, got {}",
                self.id, self.bandwidth_kbps
            )));
        }
        if !(0.0..=1.0).contains(&self.packet_loss) {
            return Err(Error::invalid(format!(
                "connection {}: packet loss must be in [0, 1], got {}",
                self.id, self.packet_loss
            )));
        }
        if !(self.distance_meters.is_finite() && self.distance_meters >= 0.0) {
            return Err(Error::invalid(format!(
                "connection {}: distance must be >= 0, got {}",
                self.id, self.distance_meters
            )));
        }
        Ok(())
    }
}

/// Serialisable picture of a topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub version: u32,
    #[serde(default)]
    pub directed: bool,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    directed: bool,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    connections: Vec<Connection>,
    connection_index: HashMap<String, usize>,
}

impl Topology {
    /// An empty undirected topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty topology where a connection only leads from source to target.
    pub fn directed() -> Self {
        Self {
            directed: true,
            ..Self::default()
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    // ── Nodes ────────────────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        tracing::debug!(node = %node.id, "node added");
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node together with every connection touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let pos = *self
            .node_index
            .get(id)
            .ok_or_else(|| Error::UnknownNode(id.to_string()))?;
        let node = self.nodes.remove(pos);
        let before = self.connections.len();
        self.connections.retain(|c| c.source != id && c.target != id);
        self.reindex();
        tracing::debug!(
            node = id,
            dropped_connections = before - self.connections.len(),
            "node removed"
        );
        Ok(node)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Update a node's status. Routing and cost estimation never read it.
    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> Result<()> {
        let &i = self
            .node_index
            .get(id)
            .ok_or_else(|| Error::UnknownNode(id.to_string()))?;
        self.nodes[i].status = status;
        Ok(())
    }

    // ── Connections ──────────────────────────────────────────────────────────

    pub fn add_connection(&mut self, connection: Connection) -> Result<()> {
        if self.connection_index.contains_key(&connection.id) {
            return Err(Error::DuplicateId(connection.id));
        }
        self.check_connection(&connection)?;
        tracing::debug!(
            connection = %connection.id,
            source = %connection.source,
            target = %connection.target,
            "connection added"
        );
        self.connection_index
            .insert(connection.id.clone(), self.connections.len());
        self.connections.push(connection);
        Ok(())
    }

    /// Replace an existing connection (matched by id), keeping its position.
    pub fn update_connection(&mut self, connection: Connection) -> Result<()> {
        let &i = self
            .connection_index
            .get(&connection.id)
            .ok_or_else(|| Error::UnknownConnection(connection.id.clone()))?;
        self.check_connection(&connection)?;
        self.connections[i] = connection;
        Ok(())
    }

    pub fn remove_connection(&mut self, id: &str) -> Result<Connection> {
        let pos = *self
            .connection_index
            .get(id)
            .ok_or_else(|| Error::UnknownConnection(id.to_string()))?;
        let removed = self.connections.remove(pos);
        self.reindex();
        Ok(removed)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connection_index.get(id).map(|&i| &self.connections[i])
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// First connection (in insertion order) that leads from `from` to `to`.
    pub fn connection_between(&self, from: &str, to: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| self.leads_to(c, from) == Some(to))
    }

    /// Connection `id`, checked to lead from `from` to `to`.
    pub fn hop(&self, id: &str, from: &str, to: &str) -> Result<&Connection> {
        let c = self
            .connection(id)
            .ok_or_else(|| Error::UnknownConnection(id.to_string()))?;
        if self.leads_to(c, from) != Some(to) {
            return Err(Error::invalid(format!(
                "connection {id} does not lead from {from} to {to}"
            )));
        }
        Ok(c)
    }

    /// Neighbors reachable from `id`, with the connection used, in
    /// connection insertion order.
    pub fn neighbors(&self, id: &str) -> Result<Vec<(&str, &Connection)>> {
        if !self.contains_node(id) {
            return Err(Error::UnknownNode(id.to_string()));
        }
        Ok(self
            .connections
            .iter()
            .filter_map(|c| self.leads_to(c, id).map(|n| (n, c)))
            .collect())
    }

    // ── Snapshot ─────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            version: SNAPSHOT_VERSION,
            directed: self.directed,
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    /// Rebuild a topology, re-running every validation.
    pub fn from_snapshot(snapshot: TopologySnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::invalid(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let mut topology = if snapshot.directed {
            Topology::directed()
        } else {
            Topology::new()
        };
        for node in snapshot.nodes {
            topology.add_node(node)?;
        }
        for connection in snapshot.connections {
            topology.add_connection(connection)?;
        }
        Ok(topology)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| Error::invalid(format!("snapshot encoding failed: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: TopologySnapshot = serde_json::from_str(text)
            .map_err(|e| Error::invalid(format!("malformed snapshot: {e}")))?;
        Self::from_snapshot(snapshot)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn leads_to<'a>(&self, c: &'a Connection, from: &str) -> Option<&'a str> {
        if self.directed {
            (c.source == from).then_some(c.target.as_str())
        } else {
            c.other_end(from)
        }
    }

    fn check_connection(&self, connection: &Connection) -> Result<()> {
        connection.validate()?;
        for end in [&connection.source, &connection.target] {
            if !self.contains_node(end) {
                return Err(Error::UnknownNode(end.clone()));
            }
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.connection_index = self
            .connections
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
    }
}
