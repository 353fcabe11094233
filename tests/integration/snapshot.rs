use crate::*;

use chunkmesh_core::{shortest_path_default, Error, TopologySnapshot};
use chunkmesh_services::load_topology;

#[test]
fn test_snapshot_file_roundtrip_routes_identically() -> Result<()> {
    let original = sample_topology()?;
    let dir = std::env::temp_dir().join(format!("chunkmesh-it-snapshot-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("net.simnet.json");
    std::fs::write(&path, original.to_json()?)?;

    let loaded = load_topology(&path)?;
    assert_eq!(loaded.nodes(), original.nodes());
    assert_eq!(loaded.connections(), original.connections());
    assert_eq!(
        shortest_path_default(&loaded, "node-1", "node-3")?,
        shortest_path_default(&original, "node-1", "node-3")?
    );

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn test_snapshot_rejects_dangling_connection() -> Result<()> {
    let text = r#"{
        "version": 1,
        "nodes": [{ "id": "x", "label": "X" }],
        "connections": [{
            "id": "xy", "source": "x", "target": "y", "kind": "wired",
            "latencyMs": 1.0, "bandwidthKbps": 10.0,
            "packetLoss": 0.0, "distanceMeters": 0.0
        }]
    }"#;
    let snapshot: TopologySnapshot = serde_json::from_str(text)?;
    assert!(matches!(
        chunkmesh_core::Topology::from_snapshot(snapshot),
        Err(Error::UnknownNode(id)) if id == "y"
    ));
    Ok(())
}

#[test]
fn test_missing_snapshot_file_has_context() {
    let err = load_topology(std::path::Path::new("/nonexistent/net.json")).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read topology"));
}
