//! Tests for the `graph` module.

use super::graph::ProximityGraph;
use crate::distance::MetricKind;
use crate::scalar::ScalarKind;

fn small_graph() -> ProximityGraph {
    ProximityGraph::new(MetricKind::L2, ScalarKind::F32, 8, 16, 100, 128)
}

#[allow(clippy::cast_precision_loss)]
#[test]
fn test_insert_and_search() {
    let graph = small_graph();

    for i in 0..100 {
        let v: Vec<f32> = (0..8).map(|j| (i * 8 + j) as f32).collect();
        graph.insert(&v);
    }

    assert_eq!(graph.len(), 100);

    let query: Vec<f32> = (0..8).map(|j| j as f32).collect();
    let results = graph.search(&query, 10, 50);

    assert!(!results.is_empty());
    assert!(results.len() <= 10);
    assert_eq!(results[0].0, 0, "node 0 is closest to the query");
}

#[test]
fn test_empty_graph_search() {
    let graph = small_graph();
    let results = graph.search(&[0.0; 8], 10, 50);
    assert!(results.is_empty());
    assert!(graph.is_empty());
}

#[test]
fn test_search_results_sorted_ascending() {
    let graph = small_graph();
    for i in 0..50 {
        #[allow(clippy::cast_precision_loss)]
        let v: Vec<f32> = vec![i as f32; 8];
        graph.insert(&v);
    }

    let results = graph.search(&[10.0; 8], 10, 64);
    for pair in results.windows(2) {
        assert!(pair[0].1 <= pair[1].1, "distances must ascend");
    }
}

#[test]
fn test_search_is_deterministic() {
    let graph = small_graph();
    for i in 0..200 {
        #[allow(clippy::cast_precision_loss)]
        let v: Vec<f32> = (0..8).map(|j| ((i * 31 + j * 7) % 97) as f32).collect();
        graph.insert(&v);
    }

    let query = vec![13.0; 8];
    let first = graph.search(&query, 10, 80);
    let second = graph.search(&query, 10, 80);
    assert_eq!(first, second);
}

#[test]
fn test_snapshot_roundtrip_preserves_search() {
    let graph = small_graph();
    for i in 0..60 {
        #[allow(clippy::cast_precision_loss)]
        let v: Vec<f32> = (0..8).map(|j| ((i + j) % 13) as f32).collect();
        graph.insert(&v);
    }

    let snapshot = graph.snapshot();
    let restored =
        ProximityGraph::from_snapshot(MetricKind::L2, ScalarKind::F32, 8, 16, 100, snapshot)
            .expect("snapshot of a live graph must restore");

    let query = vec![3.0; 8];
    assert_eq!(graph.search(&query, 5, 64), restored.search(&query, 5, 64));
    assert_eq!(graph.len(), restored.len());
    assert_eq!(graph.max_level(), restored.max_level());
}

#[test]
fn test_corrupt_snapshot_rejected() {
    let graph = small_graph();
    graph.insert(&[1.0; 8]);
    graph.insert(&[2.0; 8]);

    let mut snapshot = graph.snapshot();
    // Point a neighbor at a nonexistent node.
    snapshot.layers[0][0].push(999);

    let restored =
        ProximityGraph::from_snapshot(MetricKind::L2, ScalarKind::F32, 8, 16, 100, snapshot);
    assert!(restored.is_none());
}

#[test]
fn test_memory_usage_grows_with_vectors() {
    let graph = small_graph();
    graph.insert(&[0.0; 8]);
    let one = graph.memory_usage_bytes();
    for i in 0..20 {
        #[allow(clippy::cast_precision_loss)]
        graph.insert(&[i as f32; 8]);
    }
    assert!(graph.memory_usage_bytes() > one);
}

#[test]
fn test_quantized_graph_search() {
    let graph = ProximityGraph::new(MetricKind::L2, ScalarKind::I8, 4, 8, 50, 32);
    graph.insert(&[1.0, 0.0, 0.0, 0.0]);
    graph.insert(&[0.0, 1.0, 0.0, 0.0]);
    graph.insert(&[-1.0, -1.0, -1.0, -1.0]);

    let results = graph.search(&[0.9, 0.1, 0.0, 0.0], 1, 16);
    assert_eq!(results[0].0, 0);
}
