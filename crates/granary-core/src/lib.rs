//! # `granary-core`
//!
//! Granule-based vector similarity (HNSW) skip index for block-partitioned
//! columnar storage engines.
//!
//! At write time each data block is fed to a
//! [`VectorSimilarityAggregator`], which inserts the block's vectors into a
//! [`DenseIndex`]; when the block is exhausted the aggregator hands off an
//! immutable [`VectorSimilarityGranule`] that is persisted next to the
//! block. At read time a per-query [`VectorSimilarityCondition`] skips
//! empty granules, runs approximate graph search with a widened candidate
//! set on the rest, and the candidates are re-ranked by exact distance
//! before truncation to the requested limit.
//!
//! ## Quick Start
//!
//! ```rust
//! use granary_core::{
//!     Block, IndexAggregator, IndexDefinition, MetricKind, VectorColumn,
//!     VectorSearchParams, VectorSimilarityIndex,
//! };
//!
//! # fn main() -> granary_core::Result<()> {
//! let index = VectorSimilarityIndex::new(IndexDefinition::new(
//!     "idx_embedding",
//!     "embedding",
//!     4,
//!     MetricKind::L2,
//! ))?;
//!
//! // Write path: one aggregator per data block.
//! let mut block = Block::new();
//! block.add_column(
//!     "embedding",
//!     VectorColumn::from_rows(&[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]]),
//! )?;
//! let mut aggregator = index.create_aggregator();
//! let mut pos = 0;
//! aggregator.update(&block, &mut pos, block.rows())?;
//! let granule = aggregator.granule_and_reset()?;
//!
//! // Read path: condition per query, evaluated per granule.
//! let params = VectorSearchParams::new("embedding", vec![0.9, 0.1, 0.0, 0.0], 1, MetricKind::L2);
//! let condition = index.create_condition(Some(params));
//! let candidates = condition.nearest_rows(&granule)?;
//! assert_eq!(candidates[0].key, 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod block;
pub mod distance;
#[cfg(test)]
mod distance_tests;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod hnsw;
pub mod scalar;
pub mod skipindex;

pub use block::{Block, VectorColumn};
pub use distance::MetricKind;
pub use error::{Error, Result};
pub use hnsw::{
    DenseIndex, HnswParams, Neighbour, Statistics, DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD,
    DEFAULT_EXPANSION_SEARCH,
};
pub use scalar::ScalarKind;
pub use skipindex::{
    rerank_exact, GranulePtr, IndexAggregator, IndexCondition, IndexDefinition, IndexGranule,
    VectorSearchParams, VectorSimilarityAggregator, VectorSimilarityCondition,
    VectorSimilarityGranule, VectorSimilarityIndex, DEFAULT_MAX_LIMIT, FILE_FORMAT_VERSION,
};
