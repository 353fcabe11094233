//! chunkmesh-core — content-addressed chunks, topology, and routing.
//! The simulator crate depends on this one.

pub mod chunk;
pub mod config;
pub mod crypto;
pub mod error;
pub mod router;
pub mod topology;

pub use chunk::{chunk, chunk_bytes, Chunk, DEFAULT_CHUNK_SIZE};
pub use crypto::ContentHash;
pub use error::{Error, Result};
pub use router::{default_weight, shortest_path, shortest_path_default, Metric, Path};
pub use topology::{Connection, LinkKind, Node, NodeStatus, Topology, TopologySnapshot};
