//! chunkmesh-services — transfer timing, simulation, and the transfer ledger.

pub mod cost;
pub mod ledger;
pub mod report;
pub mod simulator;
pub mod source;

pub use cost::{base_duration, estimate_duration, LinkProfile};
pub use ledger::{TransferBlock, TransferLedger};
pub use report::{ChunkTiming, HopTiming, PathTransferReport, TransferReport, WorkerSummary};
pub use simulator::{simulate, simulate_link, simulate_over, simulate_path, Pacing, TransferSimulator};
pub use source::{chunk_file, load_topology};
