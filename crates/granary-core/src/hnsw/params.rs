//! HNSW construction parameters.

use serde::{Deserialize, Serialize};

/// Default number of bi-directional links per node.
///
/// The library defaults of typical HNSW implementations are not used here;
/// these values came out of tuning construction time, search precision and
/// queries-per-second against each other.
pub const DEFAULT_CONNECTIVITY: usize = 32;

/// Default size of the dynamic candidate list during construction.
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// Default search breadth when the query does not override it.
pub const DEFAULT_EXPANSION_SEARCH: usize = 256;

/// Parameters for HNSW index construction.
///
/// Fixed for the lifetime of an index instance and persisted in the granule
/// header so a granule can be inspected without deserializing the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Number of bi-directional links per node (the M parameter).
    /// Higher = better recall, more memory, slower insert.
    pub connectivity: usize,
    /// Size of the dynamic candidate list during construction.
    /// Higher = better recall, slower indexing.
    pub expansion_add: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
        }
    }
}

impl HnswParams {
    /// Creates custom parameters.
    #[must_use]
    pub const fn new(connectivity: usize, expansion_add: usize) -> Self {
        Self {
            connectivity,
            expansion_add,
        }
    }
}
