//! Tabular data model shared by the extractor and the exporter.

use crate::error::{Result, StatgrabError};

/// Ordered column names.
pub type HeaderRow = Vec<String>;

/// Ordered field values for one table row.
pub type DataRow = Vec<String>;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A header plus rows, every row exactly as wide as the header.
///
/// The width invariant is checked once at construction; the fields are
/// private so it cannot be broken afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: HeaderRow,
    rows: Vec<DataRow>,
}

impl Table {
    /// Build a table, failing with [`StatgrabError::SchemaMismatch`] on the
    /// first row whose width differs from the header's.
    pub fn new(headers: HeaderRow, rows: Vec<DataRow>) -> Result<Self> {
        let expected = headers.len();
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(StatgrabError::SchemaMismatch {
                row,
                expected,
                found,
            });
        }

        Ok(Self { headers, rows })
    }

    /// Column names in document order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in document order.
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
