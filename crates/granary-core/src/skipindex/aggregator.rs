//! Incremental granule builder for the vector similarity index.

use super::granule::VectorSimilarityGranule;
use super::{GranulePtr, IndexAggregator};
use crate::block::Block;
use crate::distance::MetricKind;
use crate::error::{Error, Result};
use crate::hnsw::{DenseIndex, HnswParams};
use crate::scalar::ScalarKind;
use std::sync::Arc;

/// Builds one [`VectorSimilarityGranule`] from streamed rows of one data
/// block.
///
/// The index is allocated lazily on the first `update` and moved out by
/// `granule_and_reset`; after the hand-off this aggregator holds no
/// reference to it, so nothing can mutate a granule's index afterwards.
/// Bound to a single writer thread, not shared.
pub struct VectorSimilarityAggregator {
    index_name: String,
    column: String,
    dimensions: usize,
    metric: MetricKind,
    scalar: ScalarKind,
    params: HnswParams,
    index: Option<Arc<DenseIndex>>,
}

impl VectorSimilarityAggregator {
    /// Creates an aggregator for the given index definition.
    #[must_use]
    pub fn new(
        index_name: impl Into<String>,
        column: impl Into<String>,
        dimensions: usize,
        metric: MetricKind,
        scalar: ScalarKind,
        params: HnswParams,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            column: column.into(),
            dimensions,
            metric,
            scalar,
            params,
            index: None,
        }
    }
}

impl IndexAggregator for VectorSimilarityAggregator {
    fn empty(&self) -> bool {
        self.index.as_ref().is_none_or(|index| index.is_empty())
    }

    fn update(&mut self, block: &Block, pos: &mut usize, limit: usize) -> Result<()> {
        if *pos > block.rows() {
            return Err(Error::Internal(format!(
                "Position {} is out of range for block with {} rows",
                *pos,
                block.rows()
            )));
        }

        let rows_read = limit.min(block.rows() - *pos);
        if rows_read == 0 {
            return Ok(());
        }

        let column = self.column.as_str();
        let values = block.column(column).ok_or_else(|| {
            Error::Internal(format!("Block has no column '{column}' for index update"))
        })?;

        if self.index.is_none() {
            self.index = Some(Arc::new(DenseIndex::new(
                self.dimensions,
                self.metric,
                self.scalar,
                self.params,
            )?));
        }
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::Internal("Vector index vanished during update".into()))?;

        for row in *pos..*pos + rows_read {
            let vector = values
                .row(row)
                .ok_or_else(|| Error::Internal(format!("Row {row} missing in column '{column}'")))?;
            // Keys are row ordinals within the granule, so candidates can
            // be resolved back to rows after re-ranking.
            index.add(index.len() as u64, vector)?;
        }

        *pos += rows_read;
        Ok(())
    }

    fn granule_and_reset(&mut self) -> Result<GranulePtr> {
        let index = self.index.take();
        if let Some(index) = &index {
            tracing::debug!(
                index_name = %self.index_name,
                statistics = %index.statistics(),
                "Vector similarity index built for granule"
            );
        }
        Ok(Arc::new(VectorSimilarityGranule::with_index(
            self.index_name.clone(),
            self.metric,
            self.scalar,
            self.params,
            index,
        )))
    }
}
