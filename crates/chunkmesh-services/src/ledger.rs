//! Transfer ledger — append-only record of every chunk-hop a path transfer made.
//!
//! Block numbers are consecutive from 0 across every recorded transfer.
//! The ledger lives in memory only; clones share the same log.

use std::sync::{Arc, Mutex, MutexGuard};

use chunkmesh_core::ContentHash;
use serde::{Deserialize, Serialize};

use crate::report::PathTransferReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBlock {
    pub block_number: u64,
    pub chunk_index: usize,
    pub file_name: String,
    pub content_hash: ContentHash,
    pub from: String,
    pub to: String,
    pub elapsed_seconds: f64,
    /// Milliseconds since the Unix epoch when the block was appended.
    pub recorded_at: u64,
}

#[derive(Clone, Default)]
pub struct TransferLedger {
    blocks: Arc<Mutex<Vec<TransferBlock>>>,
}

impl TransferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one block per hop of `report`, in chunk then hop order.
    /// Returns the number of blocks added.
    pub fn record(&self, file_name: &str, report: &PathTransferReport) -> usize {
        let recorded_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut blocks = self.lock();
        let first = blocks.len() as u64;
        blocks.extend(report.hops().iter().enumerate().map(|(i, hop)| TransferBlock {
            block_number: first + i as u64,
            chunk_index: hop.chunk_index,
            file_name: file_name.to_string(),
            content_hash: hop.content_hash,
            from: hop.from.clone(),
            to: hop.to.clone(),
            elapsed_seconds: hop.elapsed_seconds,
            recorded_at,
        }));
        let added = report.hops().len();
        tracing::debug!(file_name, added, total = blocks.len(), "transfer recorded");
        added
    }

    pub fn blocks(&self) -> Vec<TransferBlock> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Blocks where `node` forwarded a chunk.
    pub fn sent_by(&self, node: &str) -> Vec<TransferBlock> {
        self.lock().iter().filter(|b| b.from == node).cloned().collect()
    }

    /// Blocks where `node` received a chunk.
    pub fn received_by(&self, node: &str) -> Vec<TransferBlock> {
        self.lock().iter().filter(|b| b.to == node).cloned().collect()
    }

    /// Distinct file names that passed through `node` in either direction,
    /// in first-seen order.
    pub fn files_touching(&self, node: &str) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for b in self.lock().iter().filter(|b| b.from == node || b.to == node) {
            if !files.contains(&b.file_name) {
                files.push(b.file_name.clone());
            }
        }
        files
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave a half-written block.
    fn lock(&self) -> MutexGuard<'_, Vec<TransferBlock>> {
        self.blocks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
