//! Multi-layer proximity graph (Malkov & Yashunin HNSW).
//!
//! The graph owns its vectors in scalar-encoded form and decodes on access,
//! so one structure serves all [`ScalarKind`]s. Layer selection uses a
//! seeded xorshift64 PRNG whose state is part of the serialized snapshot,
//! which makes save/load byte-deterministic.
//!
//! Not thread-safe for concurrent insertion; one writer builds a graph,
//! readers share it immutably afterwards.

use super::candidate::Candidate;
use super::layer::{Layer, NodeId};
use crate::distance::MetricKind;
use crate::scalar::ScalarKind;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Fixed PRNG seed: graphs built from the same insertion sequence are
/// identical, which search determinism (and the tests) rely on.
const RNG_SEED: u64 = 0x5DEE_CE66_D1A4_B5B5;

/// Cap on hierarchy depth.
const MAX_LEVELS: usize = 16;

/// Serialized form of a [`ProximityGraph`], minus the construction
/// parameters (those live in the surrounding index/granule header).
#[derive(Serialize, Deserialize)]
pub(crate) struct GraphSnapshot {
    pub vectors: Vec<Vec<u8>>,
    /// Per layer, per node: neighbor ids.
    pub layers: Vec<Vec<Vec<u64>>>,
    pub entry_point: Option<u64>,
    pub max_layer: u64,
    pub rng_state: u64,
}

/// Hierarchical navigable small world graph over scalar-encoded vectors.
pub(crate) struct ProximityGraph {
    metric: MetricKind,
    scalar: ScalarKind,
    dimensions: usize,
    /// Encoded vector per node, indexed by `NodeId`.
    vectors: RwLock<Vec<Vec<u8>>>,
    /// Layer 0 is the bottom, densely connected layer.
    layers: RwLock<Vec<Layer>>,
    entry_point: RwLock<Option<NodeId>>,
    max_layer: AtomicUsize,
    count: AtomicUsize,
    rng_state: AtomicU64,
    connectivity: usize,
    /// Connectivity at layer 0 (2 * connectivity).
    connectivity_0: usize,
    expansion_add: usize,
    /// Level multiplier for layer selection (1 / ln(connectivity)).
    level_mult: f64,
}

impl ProximityGraph {
    /// Creates an empty graph.
    ///
    /// `connectivity` must be >= 2 (validated by the caller).
    pub(crate) fn new(
        metric: MetricKind,
        scalar: ScalarKind,
        dimensions: usize,
        connectivity: usize,
        expansion_add: usize,
        capacity: usize,
    ) -> Self {
        Self {
            metric,
            scalar,
            dimensions,
            vectors: RwLock::new(Vec::with_capacity(capacity)),
            layers: RwLock::new(vec![Layer::new(capacity)]),
            entry_point: RwLock::new(None),
            max_layer: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            rng_state: AtomicU64::new(RNG_SEED),
            connectivity,
            connectivity_0: connectivity * 2,
            expansion_add,
            level_mult: 1.0 / (connectivity as f64).ln(),
        }
    }

    /// Returns the number of indexed vectors.
    pub(crate) fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated node slots in the bottom layer.
    pub(crate) fn capacity(&self) -> usize {
        self.layers.read().first().map_or(0, Layer::capacity)
    }

    /// Highest populated layer index.
    pub(crate) fn max_level(&self) -> usize {
        self.max_layer.load(Ordering::Relaxed)
    }

    /// Total directed edges across all layers.
    pub(crate) fn edge_count(&self) -> usize {
        self.layers.read().iter().map(Layer::edge_count).sum()
    }

    /// Decodes the stored vector of a node.
    pub(crate) fn decode_vector(&self, node_id: NodeId) -> Option<Vec<f32>> {
        let vectors = self.vectors.read();
        let bytes = vectors.get(node_id)?;
        Some(self.scalar.decode(bytes, self.dimensions))
    }

    /// Approximate size of the graph in memory: encoded vectors plus
    /// adjacency lists. Monotone in vector count and connectivity.
    pub(crate) fn memory_usage_bytes(&self) -> usize {
        let vector_bytes = self.len() * self.scalar.bytes_per_vector(self.dimensions);
        let edge_bytes = self.edge_count() * std::mem::size_of::<NodeId>();
        vector_bytes + edge_bytes
    }

    /// Inserts a vector, returning the node id (insertion ordinal).
    ///
    /// The vector length must equal the configured dimensions (checked by
    /// the caller).
    pub(crate) fn insert(&self, vector: &[f32]) -> NodeId {
        debug_assert_eq!(vector.len(), self.dimensions);

        let node_id = {
            let mut vectors = self.vectors.write();
            let id = vectors.len();
            vectors.push(self.scalar.encode(vector));
            id
        };

        // The inserted vector participates in distance computations as its
        // decoded (possibly lossy) form, matching what searches will see.
        let stored = self
            .decode_vector(node_id)
            .unwrap_or_else(|| vector.to_vec());

        let node_layer = self.random_layer();

        {
            let mut layers = self.layers.write();
            while layers.len() <= node_layer {
                layers.push(Layer::new(node_id + 1));
            }
            for layer in layers.iter() {
                layer.ensure_capacity(node_id);
            }
        }

        let entry_point = *self.entry_point.read();

        if let Some(ep) = entry_point {
            let mut current_ep = ep;
            let max_layer = self.max_layer.load(Ordering::Relaxed);

            // Greedy descent through layers above the node's own level.
            for layer_idx in (node_layer + 1..=max_layer).rev() {
                current_ep = self.search_layer_single(&stored, current_ep, layer_idx);
            }

            for layer_idx in (0..=node_layer.min(max_layer)).rev() {
                let neighbors =
                    self.search_layer(&stored, vec![current_ep], self.expansion_add, layer_idx);

                let max_conn = if layer_idx == 0 {
                    self.connectivity_0
                } else {
                    self.connectivity
                };
                let selected = self.select_neighbors(&neighbors, max_conn);

                self.layers.read()[layer_idx].set_neighbors(node_id, selected.clone());

                for &neighbor in &selected {
                    self.link_back(node_id, neighbor, layer_idx, max_conn);
                }

                if !neighbors.is_empty() {
                    current_ep = neighbors[0].0;
                }
            }
        } else {
            *self.entry_point.write() = Some(node_id);
        }

        if node_layer > self.max_layer.load(Ordering::Relaxed) {
            self.max_layer.store(node_layer, Ordering::Relaxed);
            *self.entry_point.write() = Some(node_id);
        }

        self.count.fetch_add(1, Ordering::Relaxed);
        node_id
    }

    /// Searches for the `k` nearest nodes with search breadth `ef_search`.
    ///
    /// Returns (node id, distance) pairs sorted by ascending distance.
    pub(crate) fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<(NodeId, f32)> {
        let entry_point = *self.entry_point.read();
        let Some(ep) = entry_point else {
            return Vec::new();
        };

        let max_layer = self.max_layer.load(Ordering::Relaxed);

        let mut current_ep = ep;
        for layer_idx in (1..=max_layer).rev() {
            current_ep = self.search_layer_single(query, current_ep, layer_idx);
        }

        let candidates = self.search_layer(query, vec![current_ep], ef_search.max(k), 0);
        candidates.into_iter().take(k).collect()
    }

    // =========================================================================
    // Snapshot support
    // =========================================================================

    /// Captures the full graph state for serialization.
    pub(crate) fn snapshot(&self) -> GraphSnapshot {
        let vectors = self.vectors.read().clone();
        let node_count = vectors.len();
        let layers = self
            .layers
            .read()
            .iter()
            .map(|layer| {
                (0..node_count)
                    .map(|node| {
                        layer
                            .get_neighbors(node)
                            .into_iter()
                            .map(|n| n as u64)
                            .collect()
                    })
                    .collect()
            })
            .collect();

        GraphSnapshot {
            vectors,
            layers,
            entry_point: self.entry_point.read().map(|n| n as u64),
            max_layer: self.max_layer.load(Ordering::Relaxed) as u64,
            rng_state: self.rng_state.load(Ordering::Relaxed),
        }
    }

    /// Rebuilds a graph from a snapshot.
    ///
    /// Returns `None` if the snapshot references node ids out of range or
    /// its shape is inconsistent; the caller maps that to a corruption
    /// error.
    pub(crate) fn from_snapshot(
        metric: MetricKind,
        scalar: ScalarKind,
        dimensions: usize,
        connectivity: usize,
        expansion_add: usize,
        snapshot: GraphSnapshot,
    ) -> Option<Self> {
        let node_count = snapshot.vectors.len();
        let expected_bytes = scalar.bytes_per_vector(dimensions);
        if snapshot.vectors.iter().any(|v| v.len() != expected_bytes) {
            return None;
        }
        if snapshot.layers.is_empty() {
            return None;
        }
        if let Some(ep) = snapshot.entry_point {
            if ep as usize >= node_count {
                return None;
            }
        } else if node_count != 0 {
            return None;
        }
        if snapshot.max_layer as usize >= snapshot.layers.len() {
            return None;
        }

        let mut layers = Vec::with_capacity(snapshot.layers.len());
        for layer_nodes in &snapshot.layers {
            if layer_nodes.len() != node_count {
                return None;
            }
            let layer = Layer::new(node_count);
            for (node, neighbors) in layer_nodes.iter().enumerate() {
                if neighbors.iter().any(|&n| n as usize >= node_count) {
                    return None;
                }
                layer.set_neighbors(node, neighbors.iter().map(|&n| n as usize).collect());
            }
            layers.push(layer);
        }

        Some(Self {
            metric,
            scalar,
            dimensions,
            vectors: RwLock::new(snapshot.vectors),
            layers: RwLock::new(layers),
            entry_point: RwLock::new(snapshot.entry_point.map(|n| n as usize)),
            max_layer: AtomicUsize::new(snapshot.max_layer as usize),
            count: AtomicUsize::new(node_count),
            rng_state: AtomicU64::new(snapshot.rng_state),
            connectivity,
            connectivity_0: connectivity * 2,
            expansion_add,
            level_mult: 1.0 / (connectivity as f64).ln(),
        })
    }

    // =========================================================================
    // Private helpers
    // =========================================================================

    fn distance_to_node(&self, query: &[f32], bytes: &[u8]) -> f32 {
        let stored = self.scalar.decode(bytes, self.dimensions);
        self.metric.distance(query, &stored)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn random_layer(&self) -> usize {
        // xorshift64, state persisted across save/load.
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);

        #[allow(clippy::cast_precision_loss)]
        let uniform = (state as f64) / (u64::MAX as f64);
        let level = (-uniform.ln() * self.level_mult).floor() as usize;
        level.min(MAX_LEVELS - 1)
    }

    fn search_layer_single(&self, query: &[f32], entry: NodeId, layer: usize) -> NodeId {
        let vectors = self.vectors.read();
        let mut best = entry;
        let mut best_dist = self.distance_to_node(query, &vectors[entry]);

        loop {
            let neighbors = self.layers.read()[layer].get_neighbors(best);
            let mut improved = false;

            for neighbor in neighbors {
                let dist = self.distance_to_node(query, &vectors[neighbor]);
                if dist < best_dist {
                    best = neighbor;
                    best_dist = dist;
                    improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        best
    }

    /// ef-bounded best-first search of one layer.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: Vec<NodeId>,
        ef: usize,
        layer: usize,
    ) -> Vec<(NodeId, f32)> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut candidates: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        // One vectors lock acquisition for the entire search.
        let vectors = self.vectors.read();

        for ep in entry_points {
            let distance = self.distance_to_node(query, &vectors[ep]);
            candidates.push(Reverse(Candidate { distance, node: ep }));
            results.push(Candidate { distance, node: ep });
            visited.insert(ep);
        }

        while let Some(Reverse(current)) = candidates.pop() {
            let furthest_dist = results.peek().map_or(f32::MAX, |c| c.distance);

            if current.distance > furthest_dist && results.len() >= ef {
                break;
            }

            let neighbors = self.layers.read()[layer].get_neighbors(current.node);

            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    let distance = self.distance_to_node(query, &vectors[neighbor]);
                    let furthest = results.peek().map_or(f32::MAX, |c| c.distance);

                    if distance < furthest || results.len() < ef {
                        candidates.push(Reverse(Candidate { distance, node: neighbor }));
                        results.push(Candidate { distance, node: neighbor });

                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut result_vec: Vec<(NodeId, f32)> = results
            .into_iter()
            .map(|c| (c.node, c.distance))
            .collect();
        result_vec.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        result_vec
    }

    /// Heuristic neighbor selection: keep candidates that are closer to the
    /// query than to any already-selected neighbor, then fill the quota with
    /// the closest remainder.
    fn select_neighbors(
        &self,
        candidates: &[(NodeId, f32)],
        max_neighbors: usize,
    ) -> Vec<NodeId> {
        if candidates.len() <= max_neighbors {
            return candidates.iter().map(|(id, _)| *id).collect();
        }

        let mut selected: Vec<NodeId> = Vec::with_capacity(max_neighbors);
        let mut selected_vecs: Vec<Vec<f32>> = Vec::with_capacity(max_neighbors);

        for &(candidate_id, candidate_dist) in candidates {
            if selected.len() >= max_neighbors {
                break;
            }

            let Some(candidate_vec) = self.decode_vector(candidate_id) else {
                continue;
            };

            let is_diverse = selected_vecs.iter().all(|selected_vec| {
                candidate_dist <= self.metric.distance(&candidate_vec, selected_vec)
            });

            if is_diverse || selected.is_empty() {
                selected.push(candidate_id);
                selected_vecs.push(candidate_vec);
            }
        }

        if selected.len() < max_neighbors {
            for &(candidate_id, _) in candidates {
                if selected.len() >= max_neighbors {
                    break;
                }
                if !selected.contains(&candidate_id) {
                    selected.push(candidate_id);
                }
            }
        }

        selected
    }

    /// Adds the reverse edge neighbor -> new_node, pruning the neighbor's
    /// adjacency back to `max_conn` by distance when it overflows.
    ///
    /// Vector fetches happen before the layers lock is taken; the lock order
    /// is always vectors, then layers.
    fn link_back(&self, new_node: NodeId, neighbor: NodeId, layer: usize, max_conn: usize) {
        let Some(neighbor_vec) = self.decode_vector(neighbor) else {
            return;
        };

        let current_neighbors = self.layers.read()[layer].get_neighbors(neighbor);

        if current_neighbors.len() < max_conn {
            let layers = self.layers.read();
            let mut neighbors = layers[layer].get_neighbors(neighbor);
            neighbors.push(new_node);
            layers[layer].set_neighbors(neighbor, neighbors);
        } else {
            let mut all_neighbors = current_neighbors;
            all_neighbors.push(new_node);

            let mut with_dist: Vec<(NodeId, f32)> = all_neighbors
                .into_iter()
                .filter_map(|n| {
                    self.decode_vector(n)
                        .map(|v| (n, self.metric.distance(&neighbor_vec, &v)))
                })
                .collect();

            with_dist.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            let pruned: Vec<NodeId> = with_dist
                .into_iter()
                .take(max_conn)
                .map(|(n, _)| n)
                .collect();

            self.layers.read()[layer].set_neighbors(neighbor, pruned);
        }
    }
}
