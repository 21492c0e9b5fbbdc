//! Heap entry for best-first graph traversal.

use super::layer::NodeId;
use std::cmp::Ordering;

/// A node paired with its distance to the current query.
///
/// Orders by distance under IEEE 754 total order, so degenerate distances
/// (NaN, infinities) cannot break the heap invariant, with ties broken by
/// node id for deterministic traversal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub distance: f32,
    pub node: NodeId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node.cmp(&other.node))
    }
}
