//! Chunker — splits a byte stream into fixed-size, content-addressed chunks.

use std::io::Read;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::crypto::ContentHash;
use crate::error::{Error, Result};

/// Default chunk granularity: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One contiguous slice of a source stream.
///
/// `index` is the position in the source, not hash order. Two chunks with
/// the same bytes carry the same `content_hash` wherever they occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub index: usize,
    pub size: u64,
    pub content_hash: ContentHash,
    #[serde(skip)]
    pub data: Bytes,
}

impl Chunk {
    pub fn new(index: usize, data: Bytes) -> Self {
        Self {
            index,
            size: data.len() as u64,
            content_hash: ContentHash::of(&data),
            data,
        }
    }
}

/// Read `source` to exhaustion and split it into chunks of `chunk_size`
/// bytes. The final chunk may be shorter; an empty source yields no chunks.
pub fn chunk<R: Read>(mut source: R, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(Error::invalid("chunk size must be greater than zero"));
    }

    let mut chunks = Vec::new();
    loop {
        // Buffers grow with the bytes actually read, never to `chunk_size` up front.
        let mut buf = Vec::new();
        let filled = (&mut source)
            .take(chunk_size as u64)
            .read_to_end(&mut buf)
            .map_err(Error::Io)?;
        if filled == 0 {
            break;
        }
        chunks.push(Chunk::new(chunks.len(), Bytes::from(buf)));
        if filled < chunk_size {
            break;
        }
    }

    tracing::debug!(chunks = chunks.len(), chunk_size, "source chunked");
    Ok(chunks)
}

/// Chunk an in-memory buffer.
pub fn chunk_bytes(data: &[u8], chunk_size: usize) -> Result<Vec<Chunk>> {
    chunk(data, chunk_size)
}

/// Reassemble chunk payloads in index order.
pub fn concat(chunks: &[Chunk]) -> Vec<u8> {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);
    let mut out = Vec::with_capacity(ordered.iter().map(|c| c.data.len()).sum());
    for c in ordered {
        out.extend_from_slice(&c.data);
    }
    out
}
