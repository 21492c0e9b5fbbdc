//! Per-query evaluation of the vector similarity index.

use super::granule::VectorSimilarityGranule;
use super::{GranulePtr, IndexCondition, IndexGranule};
use crate::distance::MetricKind;
use crate::error::{Error, Result};
use crate::hnsw::Neighbour;

/// Default ceiling on the requested neighbor count. Queries asking for more
/// cannot use the index and fall back to a full scan.
pub const DEFAULT_MAX_LIMIT: usize = 1_000_000;

/// Query-time search specification extracted from the predicate/ordering
/// clause that selects nearest neighbors.
#[derive(Debug, Clone)]
pub struct VectorSearchParams {
    /// Column the query orders by distance on.
    pub column: String,
    /// The query vector.
    pub target: Vec<f32>,
    /// Requested neighbor count (the query's LIMIT).
    pub limit: usize,
    /// Metric the query compares with; must match the index's.
    pub metric: MetricKind,
    /// Search breadth override; `None` uses the index default.
    pub expansion_search: Option<usize>,
    /// Widening factor for the candidate set handed to exact re-ranking.
    /// Values above 1.0 trade search cost for result quality.
    pub postfilter_multiplier: f32,
    /// Ceiling on `limit`; larger requests disable the index.
    pub max_limit: usize,
}

impl VectorSearchParams {
    /// Creates a search spec with default expansion, no post-filter
    /// widening and the default limit ceiling.
    #[must_use]
    pub fn new(column: impl Into<String>, target: Vec<f32>, limit: usize, metric: MetricKind) -> Self {
        Self {
            column: column.into(),
            target,
            limit,
            metric,
            expansion_search: None,
            postfilter_multiplier: 1.0,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Sets the search breadth override.
    #[must_use]
    pub fn with_expansion_search(mut self, expansion_search: usize) -> Self {
        self.expansion_search = Some(expansion_search);
        self
    }

    /// Sets the post-filter widening factor (values below 1.0 are clamped
    /// to 1.0).
    #[must_use]
    pub fn with_postfilter_multiplier(mut self, multiplier: f32) -> Self {
        self.postfilter_multiplier = multiplier.max(1.0);
        self
    }

    /// Sets the limit ceiling.
    #[must_use]
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }
}

/// Per-query condition over vector similarity granules.
///
/// Built once per query by the index descriptor; evaluated once per
/// candidate granule by concurrent reader threads.
pub struct VectorSimilarityCondition {
    /// `None` when the query carries no compatible search clause; the
    /// condition is then always unknown/true and nothing can be pruned.
    params: Option<VectorSearchParams>,
    index_column: String,
    index_metric: MetricKind,
}

impl VectorSimilarityCondition {
    /// Creates a condition for one query against one index definition.
    ///
    /// A search spec naming a different column than the index's is treated
    /// the same as no spec at all.
    #[must_use]
    pub fn new(
        params: Option<VectorSearchParams>,
        index_column: impl Into<String>,
        index_metric: MetricKind,
    ) -> Self {
        let index_column = index_column.into();
        let params = params.filter(|p| p.column == index_column);
        Self {
            params,
            index_column,
            index_metric,
        }
    }

    /// Column the bound index definition covers.
    #[must_use]
    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    fn granule_of<'a>(&self, granule: &'a GranulePtr) -> Result<&'a VectorSimilarityGranule> {
        granule
            .as_any()
            .downcast_ref::<VectorSimilarityGranule>()
            .ok_or_else(|| {
                Error::Internal(
                    "Vector similarity condition got a granule of another index kind".into(),
                )
            })
    }

    /// Runs approximate search against one granule with the candidate set
    /// widened to `ceil(limit * postfilter_multiplier)`, capped at
    /// `max_limit`.
    ///
    /// Returned candidates are ordered by ascending approximate distance
    /// (ties by ascending row key) and are meant to be re-ranked by exact
    /// distance via [`rerank_exact`] before truncation to the original
    /// limit.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedQuery`] if the condition carries no usable
    /// search spec (callers should have checked
    /// [`IndexCondition::always_unknown_or_true`] first);
    /// [`Error::Internal`] for a granule of another index kind.
    pub fn nearest_rows(&self, granule: &GranulePtr) -> Result<Vec<Neighbour>> {
        let params = self.params.as_ref().ok_or_else(|| {
            Error::UnsupportedQuery(
                "Query has no vector search clause usable by this index".into(),
            )
        })?;

        let granule = self.granule_of(granule)?;
        let Some(index) = granule.index() else {
            return Ok(Vec::new());
        };

        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
        let widened = ((params.limit as f32) * params.postfilter_multiplier).ceil() as usize;
        let widened = widened.clamp(params.limit, params.max_limit.max(params.limit));

        let hits = index.search(&params.target, widened, params.expansion_search)?;
        tracing::trace!(
            column = %self.index_column,
            limit = params.limit,
            widened,
            candidates = hits.len(),
            "Approximate nearest neighbor search on granule"
        );
        Ok(hits)
    }
}

impl IndexCondition for VectorSimilarityCondition {
    fn always_unknown_or_true(&self) -> bool {
        match &self.params {
            None => true,
            Some(params) => params.metric != self.index_metric || params.limit > params.max_limit,
        }
    }

    fn may_be_true_on_granule(&self, granule: &GranulePtr) -> Result<bool> {
        let granule = self.granule_of(granule)?;
        // An empty granule covers rows without vectors to return; it can be
        // skipped. A non-empty one can never be ruled out: approximate
        // search cannot prove absence.
        Ok(!granule.empty())
    }
}

/// Exact-distance re-ranking over an approximate candidate set.
///
/// Recomputes the distance of every candidate via `fetch` (row key to
/// stored vector), stable-sorts ascending so equal distances keep the
/// candidate order, and truncates to `limit`. Candidates whose vector
/// cannot be fetched are dropped.
#[must_use]
pub fn rerank_exact<F>(
    candidates: &[Neighbour],
    target: &[f32],
    metric: MetricKind,
    limit: usize,
    fetch: F,
) -> Vec<Neighbour>
where
    F: Fn(u64) -> Option<Vec<f32>>,
{
    let mut exact: Vec<Neighbour> = candidates
        .iter()
        .filter_map(|candidate| {
            fetch(candidate.key).map(|vector| Neighbour {
                key: candidate.key,
                distance: metric.distance(target, &vector),
            })
        })
        .collect();

    exact.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    exact.truncate(limit);
    exact
}
