//! Minimal columnar block consumed by index aggregators.
//!
//! A block is the unit of streamed row input during writes: a set of named
//! columns sharing one row count. The only column type this crate needs is
//! an array-of-f32 column, stored flat with per-row offsets so rows may (in
//! a malformed input) carry differing lengths. The aggregator, not the
//! block, enforces the index's fixed dimensionality per row.

use crate::error::{Error, Result};

/// A column of f32 array rows, stored flat with end offsets.
#[derive(Debug, Clone, Default)]
pub struct VectorColumn {
    values: Vec<f32>,
    offsets: Vec<usize>,
}

impl VectorColumn {
    /// Creates an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a column from rows.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let mut column = Self::new();
        for row in rows {
            column.push_row(row);
        }
        column
    }

    /// Appends one row.
    pub fn push_row(&mut self, row: &[f32]) {
        self.values.extend_from_slice(row);
        self.offsets.push(self.values.len());
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Returns the components of row `row`, or `None` if out of range.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let end = *self.offsets.get(row)?;
        let start = if row == 0 { 0 } else { self.offsets[row - 1] };
        Some(&self.values[start..end])
    }
}

/// An immutable set of named columns sharing one row count.
#[derive(Debug, Clone, Default)]
pub struct Block {
    columns: Vec<(String, VectorColumn)>,
}

impl Block {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the column's row count differs from
    /// the block's, or a column with the same name already exists.
    pub fn add_column(&mut self, name: impl Into<String>, column: VectorColumn) -> Result<()> {
        let name = name.into();
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(Error::Internal(format!("Duplicate column '{name}' in block")));
        }
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(Error::Internal(format!(
                    "Column '{name}' has {} rows, block has {}",
                    column.len(),
                    first.len()
                )));
            }
        }
        self.columns.push((name, column));
        Ok(())
    }

    /// Returns the number of rows in the block.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&VectorColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }
}
