//! `DenseIndex`: the ANN index core.
//!
//! Wraps the proximity graph with the pieces the skip index needs on top of
//! raw graph search: configuration validation, opaque row keys, dimension
//! enforcement, deterministic result ordering, a bincode-backed
//! serialization snapshot, and structural statistics.

use super::graph::{GraphSnapshot, ProximityGraph};
use super::params::{HnswParams, DEFAULT_EXPANSION_SEARCH};
use crate::distance::MetricKind;
use crate::error::{Error, Result};
use crate::scalar::ScalarKind;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Initial node capacity; the graph grows past it automatically.
const INITIAL_CAPACITY: usize = 1024;

/// One approximate search hit: row key plus approximate distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    /// Opaque row key supplied at insertion (the row ordinal within the
    /// granule).
    pub key: u64,
    /// Approximate distance to the query under the index's metric.
    pub distance: f32,
}

/// Structural introspection of a [`DenseIndex`].
///
/// Used for diagnostics and granule-applicability heuristics, never for
/// search correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Number of indexed vectors.
    pub size: usize,
    /// Reserved node slots.
    pub capacity: usize,
    /// Approximate byte size in memory.
    pub memory_usage: usize,
    /// Encoded bytes per stored vector.
    pub bytes_per_vector: usize,
    /// Nodes in the graph (equals `size`).
    pub nodes: usize,
    /// Directed edges across all layers.
    pub edges: usize,
    /// Highest populated layer.
    pub max_level: usize,
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "size = {}, capacity = {}, memory_usage = {}, bytes_per_vector = {}, \
             nodes = {}, edges = {}, max_level = {}",
            self.size,
            self.capacity,
            self.memory_usage,
            self.bytes_per_vector,
            self.nodes,
            self.edges,
            self.max_level
        )
    }
}

/// Serialized form of [`DenseIndex`]: parameters plus graph snapshot.
///
/// The surrounding granule header versions its own fields separately; this
/// struct may change shape only together with the granule format version.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimensions: u64,
    metric: MetricKind,
    scalar: ScalarKind,
    params: HnswParams,
    keys: Vec<u64>,
    graph: GraphSnapshot,
}

/// Graph-based ANN index over fixed-dimension vectors.
///
/// Dimensions and scalar encoding are fixed for the instance's lifetime.
/// Insertion is single-writer; a finished index is shared read-only across
/// query threads.
pub struct DenseIndex {
    dimensions: usize,
    metric: MetricKind,
    scalar: ScalarKind,
    params: HnswParams,
    graph: ProximityGraph,
    /// Node id -> caller-supplied key, in insertion order.
    keys: RwLock<Vec<u64>>,
}

impl DenseIndex {
    /// Allocates an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `dimensions` is zero, `connectivity` is
    /// below 2, or the metric/scalar combination is unsupported.
    pub fn new(
        dimensions: usize,
        metric: MetricKind,
        scalar: ScalarKind,
        params: HnswParams,
    ) -> Result<Self> {
        Self::validate(dimensions, metric, scalar, params)?;
        Ok(Self {
            dimensions,
            metric,
            scalar,
            params,
            graph: ProximityGraph::new(
                metric,
                scalar,
                dimensions,
                params.connectivity,
                params.expansion_add,
                INITIAL_CAPACITY,
            ),
            keys: RwLock::new(Vec::new()),
        })
    }

    /// Checks a parameter combination without allocating anything.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DenseIndex::new`].
    pub fn validate(
        dimensions: usize,
        metric: MetricKind,
        scalar: ScalarKind,
        params: HnswParams,
    ) -> Result<()> {
        if dimensions == 0 {
            return Err(Error::Config(
                "Vector similarity index requires dimensions > 0".into(),
            ));
        }
        if params.connectivity < 2 {
            return Err(Error::Config(format!(
                "HNSW connectivity must be at least 2, got {}",
                params.connectivity
            )));
        }
        if params.expansion_add == 0 {
            return Err(Error::Config(
                "HNSW expansion_add must be positive".into(),
            ));
        }
        match (metric, scalar) {
            (MetricKind::Hamming, ScalarKind::B1) => Ok(()),
            (MetricKind::Hamming, other) => Err(Error::Config(format!(
                "Metric 'hamming' requires scalar kind 'b1', got '{other}'"
            ))),
            (other, ScalarKind::B1) => Err(Error::Config(format!(
                "Scalar kind 'b1' requires metric 'hamming', got '{other}'"
            ))),
            _ => Ok(()),
        }
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// True if no vector has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Configured vector width.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Metric the index was built with.
    #[must_use]
    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Scalar encoding of stored vectors.
    #[must_use]
    pub fn scalar(&self) -> ScalarKind {
        self.scalar
    }

    /// Construction parameters.
    #[must_use]
    pub fn params(&self) -> HnswParams {
        self.params
    }

    /// Inserts one vector under an opaque key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vector's length differs
    /// from the configured dimensions; the vector count stays unchanged.
    pub fn add(&self, key: u64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        self.graph.insert(vector);
        self.keys.write().push(key);
        Ok(())
    }

    /// Returns up to `count` candidate keys ordered by ascending
    /// approximate distance, ties broken by ascending key.
    ///
    /// `expansion_search` overrides the search breadth; `None` falls back
    /// to [`DEFAULT_EXPANSION_SEARCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the query's length differs
    /// from the configured dimensions.
    pub fn search(
        &self,
        query: &[f32],
        count: usize,
        expansion_search: Option<usize>,
    ) -> Result<Vec<Neighbour>> {
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let ef = expansion_search.unwrap_or(DEFAULT_EXPANSION_SEARCH);

        // Hamming compares components bit-exact, so the query must pass
        // through the same sign quantization as the stored vectors.
        let quantized;
        let query = if self.scalar == ScalarKind::B1 {
            quantized = self.scalar.decode(&self.scalar.encode(query), self.dimensions);
            quantized.as_slice()
        } else {
            query
        };

        let keys = self.keys.read();
        let mut hits: Vec<Neighbour> = self
            .graph
            .search(query, count, ef)
            .into_iter()
            .map(|(node, distance)| Neighbour {
                key: keys[node],
                distance,
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.key.cmp(&b.key)));
        Ok(hits)
    }

    /// Decodes the stored vector for the node inserted `ordinal`-th.
    ///
    /// The stored form is what distance computations see, so exact
    /// re-ranking against it is consistent with the graph's own view.
    #[must_use]
    pub fn stored_vector(&self, ordinal: usize) -> Option<Vec<f32>> {
        self.graph.decode_vector(ordinal)
    }

    /// Approximate resident size in bytes.
    #[must_use]
    pub fn memory_usage_bytes(&self) -> usize {
        self.graph.memory_usage_bytes() + self.keys.read().len() * std::mem::size_of::<u64>()
    }

    /// Structural statistics for diagnostics.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let size = self.graph.len();
        Statistics {
            size,
            capacity: self.graph.capacity(),
            memory_usage: self.memory_usage_bytes(),
            bytes_per_vector: self.scalar.bytes_per_vector(self.dimensions),
            nodes: size,
            edges: self.graph.edge_count(),
            max_level: self.graph.max_level(),
        }
    }

    /// Writes a byte-exact representation of the index to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] or [`Error::Io`] on stream failure.
    pub fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let snapshot = IndexSnapshot {
            dimensions: self.dimensions as u64,
            metric: self.metric,
            scalar: self.scalar,
            params: self.params,
            keys: self.keys.read().clone(),
            graph: self.graph.snapshot(),
        };
        bincode::serialize_into(writer, &snapshot)?;
        Ok(())
    }

    /// Reconstructs an index from bytes produced by
    /// [`DenseIndex::serialize`].
    ///
    /// Search results after a save/load cycle are identical to before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptData`] on a malformed payload or internally
    /// inconsistent graph, [`Error::Config`] if the embedded parameters are
    /// themselves invalid.
    pub fn deserialize(reader: &mut dyn Read) -> Result<Self> {
        let snapshot: IndexSnapshot = bincode::deserialize_from(reader)
            .map_err(|e| Error::CorruptData(format!("Bad vector index payload: {e}")))?;

        let dimensions = usize::try_from(snapshot.dimensions)
            .map_err(|_| Error::CorruptData("Vector index dimensions overflow".into()))?;
        Self::validate(dimensions, snapshot.metric, snapshot.scalar, snapshot.params)?;

        if snapshot.keys.len() != snapshot.graph.vectors.len() {
            return Err(Error::CorruptData(format!(
                "Vector index key table has {} entries for {} vectors",
                snapshot.keys.len(),
                snapshot.graph.vectors.len()
            )));
        }

        let graph = ProximityGraph::from_snapshot(
            snapshot.metric,
            snapshot.scalar,
            dimensions,
            snapshot.params.connectivity,
            snapshot.params.expansion_add,
            snapshot.graph,
        )
        .ok_or_else(|| Error::CorruptData("Inconsistent vector index graph".into()))?;

        Ok(Self {
            dimensions,
            metric: snapshot.metric,
            scalar: snapshot.scalar,
            params: snapshot.params,
            graph,
            keys: RwLock::new(snapshot.keys),
        })
    }
}
