//! Index descriptor: the immutable factory bound to one index definition.

use super::aggregator::VectorSimilarityAggregator;
use super::condition::{VectorSearchParams, VectorSimilarityCondition};
use super::granule::VectorSimilarityGranule;
use crate::distance::MetricKind;
use crate::error::Result;
use crate::hnsw::{DenseIndex, HnswParams};
use crate::scalar::ScalarKind;
use serde::{Deserialize, Serialize};

/// Static definition of one vector similarity index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Name of the index, the key under which granules are stored.
    pub name: String,
    /// Column the index covers.
    pub column: String,
    /// Fixed vector width.
    pub dimensions: usize,
    /// Distance function.
    pub metric: MetricKind,
    /// Stored component encoding.
    pub scalar: ScalarKind,
    /// HNSW construction parameters.
    pub params: HnswParams,
}

impl IndexDefinition {
    /// Creates a definition with default HNSW parameters and f32 storage.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        dimensions: usize,
        metric: MetricKind,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            dimensions,
            metric,
            scalar: ScalarKind::F32,
            params: HnswParams::default(),
        }
    }

    /// Sets the scalar kind.
    #[must_use]
    pub fn with_scalar(mut self, scalar: ScalarKind) -> Self {
        self.scalar = scalar;
        self
    }

    /// Sets the HNSW parameters.
    #[must_use]
    pub fn with_params(mut self, params: HnswParams) -> Self {
        self.params = params;
        self
    }
}

/// Immutable factory for granules, aggregators and conditions of one index
/// definition.
///
/// One instance exists per defined index and is shared read-only across all
/// granules and queries of that index.
pub struct VectorSimilarityIndex {
    definition: IndexDefinition,
}

impl VectorSimilarityIndex {
    /// Validates the definition and binds it to factory operations.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Config`] for dimensions = 0 or an unsupported
    /// metric/scalar/parameter combination; no index is created then.
    pub fn new(definition: IndexDefinition) -> Result<Self> {
        DenseIndex::validate(
            definition.dimensions,
            definition.metric,
            definition.scalar,
            definition.params,
        )?;
        Ok(Self { definition })
    }

    /// The bound definition.
    #[must_use]
    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// Creates an empty granule for this definition.
    #[must_use]
    pub fn create_granule(&self) -> VectorSimilarityGranule {
        VectorSimilarityGranule::empty_granule(
            self.definition.name.clone(),
            self.definition.metric,
            self.definition.scalar,
            self.definition.params,
        )
    }

    /// Creates a fresh aggregator for one data block.
    #[must_use]
    pub fn create_aggregator(&self) -> VectorSimilarityAggregator {
        VectorSimilarityAggregator::new(
            self.definition.name.clone(),
            self.definition.column.clone(),
            self.definition.dimensions,
            self.definition.metric,
            self.definition.scalar,
            self.definition.params,
        )
    }

    /// Creates a condition bound to one query's search spec, or an
    /// always-true condition when the query carries none.
    #[must_use]
    pub fn create_condition(
        &self,
        params: Option<VectorSearchParams>,
    ) -> VectorSimilarityCondition {
        VectorSimilarityCondition::new(
            params,
            self.definition.column.clone(),
            self.definition.metric,
        )
    }
}
