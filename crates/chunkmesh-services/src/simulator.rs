//! Transfer simulator — moves an ordered chunk set across a link or path.
//!
//! Policy:
//!   - chunks are dealt round-robin to `parallelism` workers (min 1);
//!     workers that would receive no chunk are never started
//!   - every worker gets `bandwidth / parallelism` of each link for the
//!     whole run; shares are not rebalanced as workers finish
//!   - a worker's time is the sum of its chunks' estimates
//!   - the run's wall time is the slowest worker
//!
//! On a path a chunk is store-and-forwarded: its time is the sum of its
//! per-hop estimates, each against that hop's link.
//!
//! Every worker draws loss penalties from its own ChaCha8 stream, seeded
//! from the caller's RNG in worker order before any chunk is processed.
//! Results do not depend on how workers are scheduled, so `simulate` and
//! `TransferSimulator::run` agree exactly for the same seed.

use std::sync::Arc;
use std::time::Duration;

use chunkmesh_core::config::{ChunkmeshConfig, PacingMode};
use chunkmesh_core::{Chunk, Connection, ContentHash, Error, Path, Result, Topology};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};

use crate::cost::LinkProfile;
use crate::report::{
    ChunkTiming, HopTiming, PathTransferReport, TransferReport, WorkerOutcome, WorkerSummary,
};

/// One link a chunk crosses.
#[derive(Debug, Clone)]
struct Leg {
    connection: String,
    from: String,
    to: String,
    link: LinkProfile,
}

impl Leg {
    fn direct(link: LinkProfile) -> Self {
        Self {
            connection: String::new(),
            from: String::new(),
            to: String::new(),
            link,
        }
    }
}

#[derive(Debug, Clone)]
struct ChunkRef {
    index: usize,
    size: u64,
    content_hash: ContentHash,
}

struct WorkerPlan {
    worker: usize,
    chunks: Vec<ChunkRef>,
    rng: ChaCha8Rng,
}

// ── Closed form ───────────────────────────────────────────────────────────────

/// Simulate `chunks` over a single link with the given parameters.
///
/// Fails with `InvalidArgument` before any chunk is processed if the link
/// parameters are out of range.
pub fn simulate<R: Rng + ?Sized>(
    chunks: &[Chunk],
    bandwidth_kbps: f64,
    latency_ms: f64,
    packet_loss: f64,
    parallelism: usize,
    rng: &mut R,
) -> Result<TransferReport> {
    let link = LinkProfile::new(bandwidth_kbps, latency_ms, packet_loss)?;
    simulate_over(chunks, link, parallelism, rng)
}

/// Simulate `chunks` over an already validated link profile.
pub fn simulate_over<R: Rng + ?Sized>(
    chunks: &[Chunk],
    link: LinkProfile,
    parallelism: usize,
    rng: &mut R,
) -> Result<TransferReport> {
    link.validate()?;
    let workers = parallelism.max(1);
    let legs = [Leg::direct(link)];
    let outcomes = plan(chunks, workers, rng)
        .into_iter()
        .map(|p| run_worker(p, &legs, workers))
        .collect::<Result<Vec<_>>>()?;
    let report = TransferReport::from_outcomes(&outcomes);
    log_report(&report, workers);
    Ok(report)
}

/// Simulate `chunks` over one connection of a topology.
pub fn simulate_link<R: Rng + ?Sized>(
    chunks: &[Chunk],
    connection: &Connection,
    parallelism: usize,
    rng: &mut R,
) -> Result<TransferReport> {
    simulate_over(chunks, LinkProfile::from(connection), parallelism, rng)
}

/// Simulate `chunks` store-and-forward along `path`.
///
/// Every hop must be a connection of `topology` leading from one path node
/// to the next. A single-node path moves nothing and takes no time; an
/// empty path is rejected.
pub fn simulate_path<R: Rng + ?Sized>(
    topology: &Topology,
    path: &Path,
    chunks: &[Chunk],
    parallelism: usize,
    rng: &mut R,
) -> Result<PathTransferReport> {
    let legs = legs_for(topology, path)?;
    let workers = parallelism.max(1);
    let outcomes = plan(chunks, workers, rng)
        .into_iter()
        .map(|p| run_worker(p, &legs, workers))
        .collect::<Result<Vec<_>>>()?;
    let report = PathTransferReport::from_outcomes(path.nodes().to_vec(), &outcomes);
    log_report(report.report(), workers);
    Ok(report)
}

// ── Concurrent runner ─────────────────────────────────────────────────────────

/// Whether workers spend their estimated time on the wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Pacing {
    /// Never sleep; a run finishes as fast as it computes.
    #[default]
    Instant,
    /// Sleep `elapsed * time_scale` after each chunk.
    Realtime { time_scale: f64 },
}

/// Runs each worker as its own tokio task. Workers report to a collector
/// over an mpsc channel; the collector also listens for shutdown.
#[derive(Debug, Clone)]
pub struct TransferSimulator {
    parallelism: usize,
    pacing: Pacing,
}

impl TransferSimulator {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
            pacing: Pacing::Instant,
        }
    }

    pub fn from_config(config: &ChunkmeshConfig) -> Self {
        let pacing = match config.transfer.pacing {
            PacingMode::Instant => Pacing::Instant,
            PacingMode::Realtime => Pacing::Realtime {
                time_scale: config.transfer.time_scale,
            },
        };
        Self::new(config.parallelism()).with_pacing(pacing)
    }

    /// The RNG a configured run starts from: ChaCha8 seeded with `transfer.seed`.
    pub fn seeded_rng(config: &ChunkmeshConfig) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(config.transfer.seed)
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Concurrent counterpart of `simulate_over`.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        chunks: &[Chunk],
        link: LinkProfile,
        rng: &mut R,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<TransferReport> {
        link.validate()?;
        let plans = plan(chunks, self.parallelism, rng);
        let outcomes = self
            .execute(plans, Arc::from(vec![Leg::direct(link)]), shutdown)
            .await?;
        let report = TransferReport::from_outcomes(&outcomes);
        log_report(&report, self.parallelism);
        Ok(report)
    }

    /// Concurrent counterpart of `simulate_path`.
    pub async fn run_path<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        path: &Path,
        chunks: &[Chunk],
        rng: &mut R,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<PathTransferReport> {
        let legs = legs_for(topology, path)?;
        let plans = plan(chunks, self.parallelism, rng);
        let outcomes = self.execute(plans, Arc::from(legs), shutdown).await?;
        let report = PathTransferReport::from_outcomes(path.nodes().to_vec(), &outcomes);
        log_report(report.report(), self.parallelism);
        Ok(report)
    }

    async fn execute(
        &self,
        plans: Vec<WorkerPlan>,
        legs: Arc<[Leg]>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<Vec<WorkerOutcome>> {
        let (tx, mut rx) = mpsc::channel(plans.len().max(1));
        let mut tasks = Vec::with_capacity(plans.len());

        for plan in plans {
            let tx = tx.clone();
            let legs = legs.clone();
            let workers = self.parallelism;
            let pacing = self.pacing;
            tasks.push(tokio::spawn(async move {
                let outcome = run_worker(plan, &legs, workers);
                if let (Ok(o), Pacing::Realtime { time_scale }) = (&outcome, pacing) {
                    for c in &o.chunks {
                        if let Ok(d) = Duration::try_from_secs_f64(c.elapsed_seconds * time_scale) {
                            tokio::time::sleep(d).await;
                        }
                    }
                }
                let _ = tx.send(outcome).await;
            }));
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut listening = true;
        loop {
            tokio::select! {
                signal = shutdown.recv(), if listening => {
                    match signal {
                        Err(broadcast::error::RecvError::Closed) => listening = false,
                        _ => {
                            tracing::warn!(finished = outcomes.len(), workers = tasks.len(), "transfer simulation cancelled");
                            tasks.iter().for_each(|t| t.abort());
                            return Err(Error::Cancelled);
                        }
                    }
                }

                msg = rx.recv() => match msg {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(e)) => {
                        tasks.iter().for_each(|t| t.abort());
                        return Err(e);
                    }
                    None => break,
                }
            }
        }
        Ok(outcomes)
    }
}

// ── Workers ───────────────────────────────────────────────────────────────────

// Workers beyond the chunk count would sit idle, so only busy workers get a
// plan. The requested count still divides the bandwidth in `run_worker`.
fn plan<R: Rng + ?Sized>(chunks: &[Chunk], workers: usize, rng: &mut R) -> Vec<WorkerPlan> {
    let busy = workers.min(chunks.len()).max(1);
    let mut plans: Vec<WorkerPlan> = (0..busy)
        .map(|worker| WorkerPlan {
            worker,
            chunks: Vec::with_capacity(chunks.len() / busy + 1),
            rng: ChaCha8Rng::seed_from_u64(rng.gen()),
        })
        .collect();
    for (position, chunk) in chunks.iter().enumerate() {
        plans[position % busy].chunks.push(ChunkRef {
            index: chunk.index,
            size: chunk.size,
            content_hash: chunk.content_hash,
        });
    }
    plans
}

fn run_worker(plan: WorkerPlan, legs: &[Leg], workers: usize) -> Result<WorkerOutcome> {
    let WorkerPlan {
        worker,
        chunks,
        mut rng,
    } = plan;
    let shares: Vec<LinkProfile> = legs.iter().map(|l| l.link.share(workers)).collect();

    let mut timings = Vec::with_capacity(chunks.len());
    let mut hops = Vec::with_capacity(chunks.len() * legs.len());
    let mut elapsed = 0.0;
    let mut bytes = 0;

    for chunk in &chunks {
        let mut chunk_elapsed = 0.0;
        for (leg, share) in legs.iter().zip(&shares) {
            let d = share.estimate(chunk.size, &mut rng)?;
            chunk_elapsed += d;
            hops.push(HopTiming {
                chunk_index: chunk.index,
                content_hash: chunk.content_hash,
                connection: leg.connection.clone(),
                from: leg.from.clone(),
                to: leg.to.clone(),
                elapsed_seconds: d,
            });
        }
        elapsed += chunk_elapsed;
        bytes += chunk.size;
        timings.push(ChunkTiming {
            chunk_index: chunk.index,
            worker,
            elapsed_seconds: chunk_elapsed,
        });
    }

    tracing::debug!(worker, chunks = chunks.len(), bytes, elapsed, "worker finished");
    Ok(WorkerOutcome {
        summary: WorkerSummary {
            worker,
            chunk_indices: chunks.iter().map(|c| c.index).collect(),
            bytes,
            elapsed_seconds: elapsed,
        },
        chunks: timings,
        hops,
    })
}

fn legs_for(topology: &Topology, path: &Path) -> Result<Vec<Leg>> {
    if path.is_empty() {
        return Err(Error::invalid("cannot transfer over an empty path"));
    }
    let nodes = path.nodes();
    if !topology.contains_node(&nodes[0]) {
        return Err(Error::UnknownNode(nodes[0].clone()));
    }
    nodes
        .windows(2)
        .zip(path.hops())
        .map(|(pair, id)| {
            let c = topology.hop(id, &pair[0], &pair[1])?;
            let link = LinkProfile::from(c);
            link.validate()?;
            Ok(Leg {
                connection: c.id.clone(),
                from: pair[0].clone(),
                to: pair[1].clone(),
                link,
            })
        })
        .collect()
}

fn log_report(report: &TransferReport, workers: usize) {
    tracing::info!(
        chunks = report.chunks().len(),
        workers,
        bytes = report.total_bytes(),
        elapsed = report.total_elapsed_seconds(),
        throughput = report.throughput_bytes_per_second(),
        "transfer simulated"
    );
}
