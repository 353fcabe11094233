//! Error taxonomy shared by every chunkmesh component.
//!
//! All validation errors are raised synchronously by the call that violates
//! the precondition. "No path" is not an error: the router returns an empty
//! `Path` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-positive size or bandwidth, out-of-range loss, empty path, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The byte source failed before it was exhausted.
    #[error("invalid argument: byte source failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// A weight function returned a negative (or NaN) cost for a connection.
    #[error("invalid weight {weight} for connection {connection}")]
    InvalidWeight { connection: String, weight: f64 },

    /// A paced simulation was interrupted by the shutdown signal.
    #[error("simulation cancelled")]
    Cancelled,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
