use crate::*;

use chunkmesh_core::{chunk_bytes, shortest_path_default, Error, DEFAULT_CHUNK_SIZE};
use chunkmesh_services::{
    base_duration, simulate, simulate_link, simulate_path, LinkProfile, TransferLedger,
    TransferSimulator,
};
use tokio::sync::broadcast;

#[test]
fn test_two_hundred_kilobytes_over_two_workers() -> Result<()> {
    let data = payload(200_000);
    let chunks = chunk_bytes(&data, DEFAULT_CHUNK_SIZE)?;
    let sizes: Vec<u64> = chunks.iter().map(|c| c.size).collect();
    assert_eq!(sizes, vec![65_536, 65_536, 65_536, 3_392]);

    let report = simulate(&chunks, 1024.0, 20.0, 0.0, 2, &mut seeded(0))?;

    let workers = report.workers();
    assert_eq!(workers[0].chunk_indices, vec![0, 2]);
    assert_eq!(workers[1].chunk_indices, vec![1, 3]);

    // Each worker sees 512 kbps.
    let full = base_duration(65_536, 512.0, 20.0);
    let tail = base_duration(3_392, 512.0, 20.0);
    assert!((workers[0].elapsed_seconds - 2.0 * full).abs() < 1e-9);
    assert!((workers[1].elapsed_seconds - (full + tail)).abs() < 1e-9);
    assert!((report.total_elapsed_seconds() - 2.088).abs() < 1e-9);
    assert_eq!(report.total_bytes(), 200_000);
    assert!((report.throughput_bytes_per_second() - 200_000.0 / 2.088).abs() < 1e-6);

    let order: Vec<usize> = report.chunks().iter().map(|c| c.chunk_index).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
    Ok(())
}

#[test]
fn test_route_then_transfer_then_record() -> Result<()> {
    let topology = sample_topology()?;
    let path = shortest_path_default(&topology, "node-1", "node-3")?;
    assert_eq!(path.nodes(), ["node-1", "node-2", "node-3"]);
    assert_eq!(path.hops(), ["conn-1", "conn-2"]);

    let chunks = chunk_bytes(&payload(10_000), 1_024)?;
    let report = simulate_path(&topology, &path, &chunks, 2, &mut seeded(21))?;
    assert_eq!(report.report().chunks().len(), chunks.len());
    assert_eq!(report.hops().len(), chunks.len() * 2);

    // Loss can only lengthen a hop, never shorten it.
    for hop in report.hops() {
        let conn = topology.connection(&hop.connection).context("hop connection")?;
        let floor = base_duration(
            chunks[hop.chunk_index].size,
            conn.bandwidth_kbps / 2.0,
            conn.latency_ms,
        );
        assert!(hop.elapsed_seconds >= floor - 1e-12);
        if conn.packet_loss == 0.0 {
            assert!((hop.elapsed_seconds - floor).abs() < 1e-12);
        }
    }

    let ledger = TransferLedger::new();
    assert_eq!(ledger.record("report.pdf", &report), chunks.len() * 2);
    assert_eq!(ledger.sent_by("node-1").len(), chunks.len());
    assert_eq!(ledger.received_by("node-3").len(), chunks.len());
    for block in ledger.received_by("node-3") {
        assert_eq!(block.content_hash, chunks[block.chunk_index].content_hash);
    }
    Ok(())
}

#[test]
fn test_link_simulation_uses_connection_parameters() -> Result<()> {
    let topology = sample_topology()?;
    let conn = topology.connection("conn-1").context("conn-1")?;
    let chunks = chunk_bytes(&payload(4_096), 1_024)?;

    let via_link = simulate_link(&chunks, conn, 1, &mut seeded(3))?;
    let direct = simulate(&chunks, 100.0, 10.0, 0.0, 1, &mut seeded(3))?;
    assert_eq!(via_link, direct);
    Ok(())
}

#[test]
fn test_reproducible_under_fixed_seed() -> Result<()> {
    let topology = sample_topology()?;
    let path = shortest_path_default(&topology, "node-1", "node-3")?;
    let chunks = chunk_bytes(&payload(50_000), 2_048)?;

    let first = simulate_path(&topology, &path, &chunks, 3, &mut seeded(99))?;
    let second = simulate_path(&topology, &path, &chunks, 3, &mut seeded(99))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_bad_parameters_fail_before_processing() -> Result<()> {
    let chunks = chunk_bytes(&payload(1_000), 100)?;
    assert!(matches!(
        simulate(&chunks, -5.0, 10.0, 0.0, 1, &mut seeded(0)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        chunk_bytes(&payload(1_000), 0),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_runner_agrees_with_closed_form() -> Result<()> {
    let topology = sample_topology()?;
    let path = shortest_path_default(&topology, "node-1", "node-3")?;
    let chunks = chunk_bytes(&payload(30_000), 4_096)?;

    let expected = simulate_path(&topology, &path, &chunks, 4, &mut seeded(8))?;
    let (_shutdown_tx, shutdown) = broadcast::channel(1);
    let got = TransferSimulator::new(4)
        .run_path(&topology, &path, &chunks, &mut seeded(8), shutdown)
        .await?;
    assert_eq!(got, expected);

    let link = LinkProfile::new(100.0, 10.0, 0.0)?;
    let (_shutdown_tx, shutdown) = broadcast::channel(1);
    let single = TransferSimulator::new(1)
        .run(&chunks, link, &mut seeded(8), shutdown)
        .await?;
    let sum: f64 = single.chunks().iter().map(|c| c.elapsed_seconds).sum();
    assert!((single.total_elapsed_seconds() - sum).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_report_serialises_for_collaborators() -> Result<()> {
    let chunks = chunk_bytes(&payload(3_000), 1_000)?;
    let report = simulate(&chunks, 80.0, 5.0, 0.0, 2, &mut seeded(0))?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["totalBytes"], 3_000);
    assert_eq!(json["chunks"].as_array().map(|a| a.len()), Some(3));
    assert!(json["throughputBytesPerSecond"].is_number());
    assert_eq!(json["chunks"][0]["chunkIndex"], 0);
    Ok(())
}
