//! Transfer reports — the only output of a simulation run.
//!
//! Reports are assembled once from worker outcomes and exposed read-only.
//! They serialise with serde so a host can ship them in an HTTP body or a
//! message payload. An unbounded throughput (zero elapsed time) is written
//! as `null`.

use chunkmesh_core::ContentHash;
use serde::{Deserialize, Serialize};

/// Time one chunk spent in transit, tagged with the worker that carried it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkTiming {
    pub chunk_index: usize,
    pub worker: usize,
    pub elapsed_seconds: f64,
}

/// One chunk crossing one link of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopTiming {
    pub chunk_index: usize,
    pub content_hash: ContentHash,
    pub connection: String,
    pub from: String,
    pub to: String,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub worker: usize,
    /// Chunks assigned to this worker, in processing order.
    pub chunk_indices: Vec<usize>,
    pub bytes: u64,
    pub elapsed_seconds: f64,
}

/// Everything one worker produced. Merged into a report at the end of a run.
#[derive(Debug, Clone)]
pub(crate) struct WorkerOutcome {
    pub summary: WorkerSummary,
    pub chunks: Vec<ChunkTiming>,
    pub hops: Vec<HopTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    chunks: Vec<ChunkTiming>,
    workers: Vec<WorkerSummary>,
    total_elapsed_seconds: f64,
    total_bytes: u64,
    #[serde(with = "unbounded")]
    throughput_bytes_per_second: f64,
}

impl TransferReport {
    /// Merge worker outcomes. Wall time is the slowest worker, not the sum.
    pub(crate) fn from_outcomes(outcomes: &[WorkerOutcome]) -> Self {
        let mut workers: Vec<WorkerSummary> =
            outcomes.iter().map(|o| o.summary.clone()).collect();
        workers.sort_by_key(|w| w.worker);

        let mut chunks: Vec<ChunkTiming> =
            outcomes.iter().flat_map(|o| o.chunks.iter().cloned()).collect();
        chunks.sort_by_key(|c| c.chunk_index);

        let total_elapsed_seconds = workers
            .iter()
            .map(|w| w.elapsed_seconds)
            .fold(0.0, f64::max);
        let total_bytes = workers.iter().map(|w| w.bytes).sum();

        Self {
            chunks,
            workers,
            total_elapsed_seconds,
            total_bytes,
            throughput_bytes_per_second: throughput(total_bytes, total_elapsed_seconds),
        }
    }

    /// Per-chunk timings in ascending chunk index order.
    pub fn chunks(&self) -> &[ChunkTiming] {
        &self.chunks
    }

    /// Per-worker totals in worker order.
    pub fn workers(&self) -> &[WorkerSummary] {
        &self.workers
    }

    pub fn total_elapsed_seconds(&self) -> f64 {
        self.total_elapsed_seconds
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// `f64::INFINITY` when nothing took any time (e.g. zero chunks).
    pub fn throughput_bytes_per_second(&self) -> f64 {
        self.throughput_bytes_per_second
    }
}

/// Aggregate report for a multi-hop transfer plus the per-hop breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathTransferReport {
    path: Vec<String>,
    report: TransferReport,
    hops: Vec<HopTiming>,
}

impl PathTransferReport {
    pub(crate) fn from_outcomes(path: Vec<String>, outcomes: &[WorkerOutcome]) -> Self {
        let mut hops: Vec<HopTiming> =
            outcomes.iter().flat_map(|o| o.hops.iter().cloned()).collect();
        // Stable: keeps hop order within each chunk.
        hops.sort_by_key(|h| h.chunk_index);
        Self {
            path,
            report: TransferReport::from_outcomes(outcomes),
            hops,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn report(&self) -> &TransferReport {
        &self.report
    }

    /// Hop timings ordered by chunk index, then by position along the path.
    pub fn hops(&self) -> &[HopTiming] {
        &self.hops
    }
}

fn throughput(bytes: u64, seconds: f64) -> f64 {
    if seconds == 0.0 {
        f64::INFINITY
    } else {
        bytes as f64 / seconds
    }
}

mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_some(v)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}
