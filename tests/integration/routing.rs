use crate::*;

use chunkmesh_core::config::ChunkmeshConfig;
use chunkmesh_core::{shortest_path, shortest_path_default, Error, Metric, NodeStatus};

#[test]
fn test_default_metric_prefers_fast_multi_hop() -> Result<()> {
    let t = mesh_topology()?;
    let p = shortest_path_default(&t, "a", "d")?;
    assert_eq!(p.nodes(), ["a", "b", "c", "d"]);
    assert!((p.cost() - 15.3).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_each_metric_picks_its_own_route() -> Result<()> {
    let t = mesh_topology()?;
    let route = |m: Metric| -> Result<Vec<String>> {
        Ok(shortest_path(&t, "a", "d", m.as_fn())?.nodes().to_vec())
    };
    assert_eq!(route(Metric::Latency)?, ["a", "e", "d"]);
    assert_eq!(route(Metric::InverseBandwidth)?, ["a", "d"]);
    assert_eq!(route(Metric::LatencyBandwidth)?, ["a", "b", "c", "d"]);
    Ok(())
}

#[test]
fn test_metric_from_config() -> Result<()> {
    let t = mesh_topology()?;
    let mut config = ChunkmeshConfig::default();
    config.apply_overrides(|k| (k == "CHUNKMESH_ROUTING__METRIC").then(|| "latency".to_string()));
    let p = shortest_path(&t, "a", "d", config.routing.metric.as_fn())?;
    assert_eq!(p.hops(), ["ae", "ed"]);
    Ok(())
}

#[test]
fn test_removing_a_link_reroutes() -> Result<()> {
    let mut t = mesh_topology()?;
    t.remove_connection("bc")?;
    let p = shortest_path_default(&t, "a", "d")?;
    assert_eq!(p.nodes(), ["a", "e", "d"]);

    t.remove_node("e")?;
    let p = shortest_path_default(&t, "a", "d")?;
    assert_eq!(p.nodes(), ["a", "d"]);

    t.remove_connection("ad")?;
    assert!(shortest_path_default(&t, "a", "d")?.is_empty());
    Ok(())
}

#[test]
fn test_node_status_does_not_affect_routing() -> Result<()> {
    let mut t = mesh_topology()?;
    let before = shortest_path_default(&t, "a", "d")?;
    t.set_status("b", NodeStatus::Offline)?;
    t.set_status("c", NodeStatus::Transferring)?;
    assert_eq!(shortest_path_default(&t, "a", "d")?, before);
    Ok(())
}

#[test]
fn test_negative_weight_function_is_rejected() -> Result<()> {
    let t = mesh_topology()?;
    let err = shortest_path(&t, "a", "d", |c| c.latency_ms - 3.0).unwrap_err();
    assert!(matches!(err, Error::InvalidWeight { .. }));
    Ok(())
}
