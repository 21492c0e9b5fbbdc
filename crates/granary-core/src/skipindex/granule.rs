//! Persisted granule of the vector similarity index.

use super::IndexGranule;
use crate::distance::MetricKind;
use crate::error::{Error, Result};
use crate::hnsw::{DenseIndex, HnswParams};
use crate::scalar::ScalarKind;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io::{Read, Write};
use std::sync::Arc;

/// Version of the granule's persistence format. Increment on any structural
/// change to the header.
///
/// The serialized `DenseIndex` payload carries its own structure, but we
/// can't fold the two together: the index core is (at least in theory)
/// swappable for any compliant graph-ANN implementation, and data outside
/// it (the parameters in the header) must stay recoverable even if the
/// core's format changes.
pub const FILE_FORMAT_VERSION: u64 = 1;

/// Header fields following the raw version word.
#[derive(Serialize, Deserialize)]
struct GranuleHeader {
    index_name: String,
    metric_code: u8,
    scalar_code: u8,
    connectivity: u64,
    expansion_add: u64,
    vector_count: u64,
}

/// Immutable snapshot of one [`DenseIndex`] plus its construction
/// parameters; the unit persisted per data block.
pub struct VectorSimilarityGranule {
    index_name: String,
    metric: MetricKind,
    scalar: ScalarKind,
    params: HnswParams,
    /// `None` for a granule built from zero rows.
    index: Option<Arc<DenseIndex>>,
}

impl VectorSimilarityGranule {
    /// Creates an empty granule for the given definition parameters.
    #[must_use]
    pub fn empty_granule(
        index_name: impl Into<String>,
        metric: MetricKind,
        scalar: ScalarKind,
        params: HnswParams,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            metric,
            scalar,
            params,
            index: None,
        }
    }

    /// Wraps a finished index handed off by an aggregator.
    #[must_use]
    pub fn with_index(
        index_name: impl Into<String>,
        metric: MetricKind,
        scalar: ScalarKind,
        params: HnswParams,
        index: Option<Arc<DenseIndex>>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            metric,
            scalar,
            params,
            index,
        }
    }

    /// Name of the index definition this granule belongs to.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Metric the contained index was built with.
    #[must_use]
    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Scalar encoding of the contained index.
    #[must_use]
    pub fn scalar(&self) -> ScalarKind {
        self.scalar
    }

    /// Construction parameters recorded in the header.
    #[must_use]
    pub fn params(&self) -> HnswParams {
        self.params
    }

    /// Shared handle to the contained index, if any.
    #[must_use]
    pub fn index(&self) -> Option<&Arc<DenseIndex>> {
        self.index.as_ref()
    }

    /// Reads a granule previously written by
    /// [`IndexGranule::serialize_binary`].
    ///
    /// # Errors
    ///
    /// [`Error::CorruptData`] if the format version is newer than
    /// supported, the metric/scalar byte is unrecognized, or the payload is
    /// malformed. No existing granule state is touched on failure; this
    /// constructs a fresh granule or nothing.
    pub fn deserialize_binary(reader: &mut dyn Read) -> Result<Self> {
        let mut version_bytes = [0u8; 8];
        reader.read_exact(&mut version_bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::CorruptData(
                    "Vector similarity granule is shorter than its version prefix".into(),
                )
            } else {
                Error::Io(e)
            }
        })?;
        let version = u64::from_le_bytes(version_bytes);
        if version > FILE_FORMAT_VERSION {
            return Err(Error::CorruptData(format!(
                "Vector similarity granule has format version {version}, \
                 but only versions up to {FILE_FORMAT_VERSION} are supported"
            )));
        }

        let header: GranuleHeader = bincode::deserialize_from(&mut *reader)
            .map_err(|e| Error::CorruptData(format!("Bad granule header: {e}")))?;

        let metric = MetricKind::from_code(header.metric_code).ok_or_else(|| {
            Error::CorruptData(format!(
                "Unknown metric kind code {} in granule header",
                header.metric_code
            ))
        })?;
        let scalar = ScalarKind::from_code(header.scalar_code).ok_or_else(|| {
            Error::CorruptData(format!(
                "Unknown scalar kind code {} in granule header",
                header.scalar_code
            ))
        })?;
        let params = HnswParams::new(
            usize::try_from(header.connectivity)
                .map_err(|_| Error::CorruptData("Granule connectivity overflow".into()))?,
            usize::try_from(header.expansion_add)
                .map_err(|_| Error::CorruptData("Granule expansion_add overflow".into()))?,
        );

        let index = if header.vector_count == 0 {
            None
        } else {
            let index = DenseIndex::deserialize(reader)?;
            if index.len() as u64 != header.vector_count {
                return Err(Error::CorruptData(format!(
                    "Granule header declares {} vectors, payload holds {}",
                    header.vector_count,
                    index.len()
                )));
            }
            Some(Arc::new(index))
        };

        tracing::trace!(
            index_name = %header.index_name,
            vectors = header.vector_count,
            "Loaded vector similarity granule"
        );

        Ok(Self {
            index_name: header.index_name,
            metric,
            scalar,
            params,
            index,
        })
    }
}

impl IndexGranule for VectorSimilarityGranule {
    fn empty(&self) -> bool {
        self.index.as_ref().is_none_or(|index| index.is_empty())
    }

    fn serialize_binary(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(&FILE_FORMAT_VERSION.to_le_bytes())?;

        let vector_count = self.index.as_ref().map_or(0, |index| index.len()) as u64;
        let header = GranuleHeader {
            index_name: self.index_name.clone(),
            metric_code: self.metric.to_code(),
            scalar_code: self.scalar.to_code(),
            connectivity: self.params.connectivity as u64,
            expansion_add: self.params.expansion_add as u64,
            vector_count,
        };
        bincode::serialize_into(&mut *writer, &header)?;

        if let Some(index) = &self.index {
            if !index.is_empty() {
                index.serialize(writer)?;
            }
        }
        Ok(())
    }

    fn memory_usage_bytes(&self) -> usize {
        // Guarded: an empty granule has no index to ask.
        self.index
            .as_ref()
            .map_or(0, |index| index.memory_usage_bytes())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
