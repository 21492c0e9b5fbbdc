//! HNSW (Hierarchical Navigable Small World) approximate nearest neighbor
//! index.
//!
//! # Module Organization
//!
//! - `params`: construction parameters and tuned defaults
//! - `layer` / `graph`: the multi-layer proximity graph itself
//! - `index`: [`DenseIndex`], the keyed, serializable wrapper consumed by
//!   the skip index

mod candidate;
mod graph;
mod index;
mod layer;
mod params;

#[cfg(test)]
mod graph_tests;

pub use index::{DenseIndex, Neighbour, Statistics};
pub use layer::NodeId;
pub use params::{
    HnswParams, DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD, DEFAULT_EXPANSION_SEARCH,
};
