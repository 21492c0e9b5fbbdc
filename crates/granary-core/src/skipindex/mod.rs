//! Secondary-index framework surface.
//!
//! The surrounding storage engine drives indexes through narrow trait
//! objects: an [`IndexAggregator`] consumes streamed rows of one data block
//! and hands off an immutable [`IndexGranule`]; an [`IndexCondition`]
//! decides per query whether a granule can be skipped. This crate ships one
//! index kind behind those contracts — the vector similarity index — but
//! the traits are what other index kinds would implement too.
//!
//! # Ownership
//!
//! Granules are `Arc`-shared so many query threads can hold one
//! concurrently; nothing mutates a granule after hand-off. An aggregator is
//! bound to the single writer thread producing one block's granule and is
//! never shared.

use crate::error::Result;
use std::any::Any;
use std::io::Write;
use std::sync::Arc;

mod aggregator;
mod condition;
mod descriptor;
mod granule;


pub use aggregator::VectorSimilarityAggregator;
pub use condition::{
    rerank_exact, VectorSearchParams, VectorSimilarityCondition, DEFAULT_MAX_LIMIT,
};
pub use descriptor::{IndexDefinition, VectorSimilarityIndex};
pub use granule::{VectorSimilarityGranule, FILE_FORMAT_VERSION};

/// Shared handle to an immutable granule.
pub type GranulePtr = Arc<dyn IndexGranule>;

/// Immutable, serializable snapshot of one index instance for one data
/// block.
pub trait IndexGranule: Send + Sync {
    /// True iff the underlying index is absent or holds zero vectors.
    fn empty(&self) -> bool;

    /// Writes the granule's persisted representation.
    ///
    /// # Errors
    ///
    /// Stream failures surface as [`crate::Error::Io`] or
    /// [`crate::Error::Serialization`].
    fn serialize_binary(&self, writer: &mut dyn Write) -> Result<()>;

    /// Approximate resident size; 0 for an empty granule.
    fn memory_usage_bytes(&self) -> usize;

    /// Downcast support for index-kind-specific condition evaluation.
    fn as_any(&self) -> &dyn Any;
}

/// Stateful, single-use builder of one granule from streamed rows.
pub trait IndexAggregator {
    /// True iff no index has been allocated or it holds zero vectors.
    fn empty(&self) -> bool;

    /// Reads up to `limit` rows starting at `*pos` from `block`, feeds them
    /// to the in-progress index, and advances `*pos` past the consumed
    /// rows.
    ///
    /// Calls must be issued in increasing row order within one block.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Internal`] for an out-of-range cursor or a missing
    /// column; [`crate::Error::DimensionMismatch`] for a row of the wrong
    /// width.
    fn update(&mut self, block: &crate::block::Block, pos: &mut usize, limit: usize)
        -> Result<()>;

    /// Packages the accumulated index into a granule and resets this
    /// aggregator so the next `update` starts a fresh index.
    ///
    /// # Errors
    ///
    /// Currently infallible for the vector index kind; the signature leaves
    /// room for index kinds that finalize lazily.
    fn granule_and_reset(&mut self) -> Result<GranulePtr>;
}

/// Per-query decision procedure over candidate granules.
pub trait IndexCondition: Send + Sync {
    /// True when the condition cannot prune anything: the caller must scan
    /// every granule exactly.
    fn always_unknown_or_true(&self) -> bool;

    /// False iff the granule can be skipped (only provable for empty
    /// granules; approximate indexes cannot prove absence).
    ///
    /// # Errors
    ///
    /// [`crate::Error::Internal`] when handed a granule of a different
    /// index kind.
    fn may_be_true_on_granule(&self, granule: &GranulePtr) -> Result<bool>;
}
