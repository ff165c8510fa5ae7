//! The reconciled master table: one schema and one row set spanning every
//! yearly source.

use crate::error::PipelineError;

/// Reserved provenance column, always at index 0.
pub const SOURCE_YEAR_COLUMN: &str = "Source_Year";

/// Ordered schema plus rows. The schema grows monotonically as sources
/// contribute unseen columns; it never shrinks or reorders. Every row is as
/// wide as the schema was when the invariant was last enforced — growth
/// backfills older rows with empty strings.
///
/// This is a plain value threaded through the reconciliation fold, so
/// reconciliation of independent tables can run side by side in tests.
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    schema: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    /// Seed the schema from the first source. Column 0 is always the
    /// provenance column.
    pub fn seed_schema(&mut self, source_headers: &[String]) {
        debug_assert!(self.schema.is_empty());
        self.schema = std::iter::once(SOURCE_YEAR_COLUMN.to_string())
            .chain(source_headers.iter().map(|h| h.trim().to_string()))
            .collect();
    }

    /// Append a brand-new column and backfill every accumulated row with an
    /// empty cell so widths stay aligned. Returns the new column's index.
    pub fn push_column(&mut self, name: &str) -> usize {
        self.schema.push(name.trim().to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.schema.len() - 1
    }

    /// Append one normalized row. Width must equal the current schema width;
    /// anything else is an internal-consistency bug, not bad input.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), PipelineError> {
        if row.len() != self.schema.len() {
            return Err(PipelineError::MalformedRow {
                got: row.len(),
                want: self.schema.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Mutable access for in-place normalization (forward-fill).
    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }

    /// Rebuild a table from cached store rows: row 0 is the schema header,
    /// the rest are data rows (padded out to the header width if a cached
    /// row came back short).
    pub fn from_stored_rows(mut stored: Vec<Vec<String>>) -> Option<Self> {
        if stored.is_empty() {
            return None;
        }
        let schema = stored.remove(0);
        if schema.first().map(String::as_str) != Some(SOURCE_YEAR_COLUMN) {
            return None;
        }
        let width = schema.len();
        for row in &mut stored {
            row.resize(width, String::new());
        }
        Some(Self {
            schema,
            rows: stored,
        })
    }

    /// Flatten to store layout: schema header first, then data rows.
    pub fn to_stored_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.schema.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_column_backfills_existing_rows() {
        let mut t = MasterTable::new();
        t.seed_schema(&["Date".into(), "Content".into()]);
        t.push_row(vec!["2025".into(), "1/1/2025".into(), "x".into()])
            .unwrap();
        let idx = t.push_column("Owner");
        assert_eq!(idx, 3);
        assert_eq!(t.rows()[0], vec!["2025", "1/1/2025", "x", ""]);
        assert_eq!(t.rows()[0].len(), t.width());
    }

    #[test]
    fn short_row_is_rejected() {
        let mut t = MasterTable::new();
        t.seed_schema(&["Date".into()]);
        let err = t.push_row(vec!["2025".into()]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::MalformedRow { got: 1, want: 2 }
        ));
    }

    #[test]
    fn stored_round_trip() {
        let mut t = MasterTable::new();
        t.seed_schema(&["Date".into(), "Content".into()]);
        t.push_row(vec!["2025".into(), "1/1/2025".into(), "x".into()])
            .unwrap();
        let back = MasterTable::from_stored_rows(t.to_stored_rows()).unwrap();
        assert_eq!(back.schema(), t.schema());
        assert_eq!(back.rows(), t.rows());
    }

    #[test]
    fn stored_rows_without_header_are_rejected() {
        assert!(MasterTable::from_stored_rows(vec![vec!["a".into()]]).is_none());
        assert!(MasterTable::from_stored_rows(Vec::new()).is_none());
    }
}
