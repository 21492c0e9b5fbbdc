//! Error types for `granary-core`.
//!
//! One unified error enum covers the whole index lifecycle: definition-time
//! configuration checks, insert-time dimension enforcement, read-time
//! corruption and query-compatibility failures. Error codes follow the
//! pattern `GRN-XXX` for easy debugging.

use thiserror::Error;

/// Result type alias for `granary-core` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `granary-core` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid static index parameters (GRN-001).
    ///
    /// Raised at index-definition time; no partial index is created.
    #[error("[GRN-001] Configuration error: {0}")]
    Config(String),

    /// Malformed persisted granule (GRN-002).
    ///
    /// Terminal for that granule's read path. The storage engine must treat
    /// the granule as unreadable rather than silently skip it.
    #[error("[GRN-002] Corrupt data: {0}")]
    CorruptData(String),

    /// Incompatible search request (GRN-003).
    ///
    /// The condition degrades to "always true" on this, forcing a full scan
    /// instead of failing the query.
    #[error("[GRN-003] Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Vector dimensionality mismatch on insert (GRN-004).
    ///
    /// The index's vector count is left unchanged.
    #[error("[GRN-004] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensions the index was created with.
        expected: usize,
        /// Dimensions of the offending vector.
        actual: usize,
    },

    /// IO error (GRN-005).
    #[error("[GRN-005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (GRN-006).
    #[error("[GRN-006] Serialization error: {0}")]
    Serialization(String),

    /// Internal invariant violation (GRN-007).
    ///
    /// Indicates a bug in the caller or in this crate. Please report.
    #[error("[GRN-007] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "GRN-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "GRN-001",
            Self::CorruptData(_) => "GRN-002",
            Self::UnsupportedQuery(_) => "GRN-003",
            Self::DimensionMismatch { .. } => "GRN-004",
            Self::Io(_) => "GRN-005",
            Self::Serialization(_) => "GRN-006",
            Self::Internal(_) => "GRN-007",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Corruption and internal errors are not: the affected granule or index
    /// has to be rebuilt.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::CorruptData(_) | Self::Internal(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
