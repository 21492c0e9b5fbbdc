//! One level of the HNSW hierarchy.

use parking_lot::RwLock;

/// Node identifier within one graph: the insertion ordinal.
pub type NodeId = usize;

/// Adjacency lists for every node slot of one level.
///
/// A single lock guards the whole level; the graph is built by one writer,
/// so per-node locking would buy nothing here.
pub(crate) struct Layer {
    adjacency: RwLock<Vec<Vec<NodeId>>>,
}

impl Layer {
    /// Creates a layer with `capacity` empty adjacency slots.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            adjacency: RwLock::new(vec![Vec::new(); capacity]),
        }
    }

    /// Grows the layer until `node_id` has a slot.
    pub(crate) fn ensure_capacity(&self, node_id: NodeId) {
        let mut adjacency = self.adjacency.write();
        if adjacency.len() <= node_id {
            adjacency.resize_with(node_id + 1, Vec::new);
        }
    }

    /// Returns a copy of the node's neighbor list; empty for out-of-range
    /// ids.
    pub(crate) fn get_neighbors(&self, node_id: NodeId) -> Vec<NodeId> {
        self.adjacency
            .read()
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the node's neighbor list. Out-of-range ids are ignored;
    /// callers go through `ensure_capacity` first.
    pub(crate) fn set_neighbors(&self, node_id: NodeId, neighbors: Vec<NodeId>) {
        let mut adjacency = self.adjacency.write();
        if let Some(slot) = adjacency.get_mut(node_id) {
            *slot = neighbors;
        }
    }

    /// Number of allocated node slots.
    pub(crate) fn capacity(&self) -> usize {
        self.adjacency.read().len()
    }

    /// Total directed edges stored in this layer.
    pub(crate) fn edge_count(&self) -> usize {
        self.adjacency.read().iter().map(Vec::len).sum()
    }
}
