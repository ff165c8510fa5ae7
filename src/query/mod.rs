//! Filtering and alias-aware aggregation over the reconciled table.

use chrono::Datelike;
use tracing::debug;

use crate::process::normalize::parse_cell_date;
use crate::process::semantics::{role_of, Role, RoleIndex};
use crate::process::table::MasterTable;

/// Quarter or month within the filtered year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    /// 1..=4
    Quarter(u32),
    /// 1..=12
    Month(u32),
}

/// Pure predicate state; lives only in the caller's session.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub year: Option<i32>,
    pub time_range: Option<TimeRange>,
    /// Case-insensitive substring, matched against every cell.
    pub search: Option<String>,
}

/// Ranked aggregation entry for charting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

/// Aggregation output is truncated to this many entries.
const TOP_GROUPS: usize = 10;

/// Provenance years outside this range are treated as mistyped and the
/// row's parsed date decides instead.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1990..=2100;

/// Read-only view over a finished master table with the semantic roles and
/// date column resolved once up front.
pub struct QueryEngine<'a> {
    table: &'a MasterTable,
    roles: RoleIndex,
    date_col: Option<usize>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(table: &'a MasterTable, date_col: Option<usize>) -> Self {
        let roles = RoleIndex::resolve(table.schema());
        Self {
            table,
            roles,
            date_col,
        }
    }

    pub fn schema(&self) -> &[String] {
        self.table.schema()
    }

    /// Apply year, time-range and search predicates in order; returns row
    /// indexes into the table, preserving ingestion order.
    pub fn filter_rows(&self, filter: &Filter) -> Vec<usize> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| self.row_matches(row, filter, search.as_deref()))
            .map(|(i, _)| i)
            .collect()
    }

    fn row_matches(&self, row: &[String], filter: &Filter, search: Option<&str>) -> bool {
        let date = self
            .date_col
            .and_then(|c| row.get(c))
            .and_then(|cell| parse_cell_date(cell));

        if let Some(year) = filter.year {
            // provenance tag first, mistyped tags fall back to the date
            let row_year = row
                .first()
                .and_then(|c| c.trim().parse::<i32>().ok())
                .filter(|y| PLAUSIBLE_YEARS.contains(y))
                .or_else(|| date.map(|d| d.year()));
            if row_year != Some(year) {
                return false;
            }
        }

        if let Some(range) = filter.time_range {
            let Some(date) = date else {
                // undated rows never satisfy a date-based filter
                return false;
            };
            let month = date.month();
            let ok = match range {
                TimeRange::Month(m) => month == m,
                TimeRange::Quarter(q) => (month - 1) / 3 + 1 == q,
            };
            if !ok {
                return false;
            }
        }

        if let Some(term) = search {
            if !row.iter().any(|cell| cell.to_lowercase().contains(term)) {
                return false;
            }
        }

        true
    }

    /// Master columns carrying at least one non-empty value across the
    /// given (filtered) rows. Recomputed per filter change.
    pub fn active_columns(&self, row_indexes: &[usize]) -> Vec<usize> {
        (0..self.table.width())
            .filter(|&col| {
                row_indexes.iter().any(|&i| {
                    self.table.rows()[i]
                        .get(col)
                        .map(|c| !c.trim().is_empty())
                        .unwrap_or(false)
                })
            })
            .collect()
    }

    /// Column the grouped counts run over: the owner column when one
    /// exists, else the first column that is neither provenance nor date.
    pub fn aggregation_column(&self) -> Option<usize> {
        if let Some(owner) = self.roles.get(Role::Owner) {
            return Some(owner);
        }
        (1..self.table.width()).find(|&i| {
            Some(i) != self.date_col && role_of(&self.table.schema()[i]) != Some(Role::Date)
        })
    }

    /// Alias-aware grouped counts over the filtered rows, descending,
    /// truncated to the top 10. Ties keep first-encountered order.
    ///
    /// Cells holding a `;`-separated list declare aliases: the first token
    /// is canonical, the rest count toward it wherever they appear alone.
    pub fn aggregate(&self, row_indexes: &[usize]) -> Vec<GroupCount> {
        let Some(col) = self.aggregation_column() else {
            return Vec::new();
        };

        let cells: Vec<&str> = row_indexes
            .iter()
            .filter_map(|&i| self.table.rows()[i].get(col))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        // alias map: every non-first token of a `;` list -> first token
        let mut aliases: Vec<(String, String)> = Vec::new();
        for cell in &cells {
            if !cell.contains(';') {
                continue;
            }
            let mut tokens = cell.split(';').map(str::trim).filter(|t| !t.is_empty());
            let Some(canonical) = tokens.next() else {
                continue;
            };
            for alias in tokens {
                if !aliases.iter().any(|(a, _)| a == alias) {
                    aliases.push((alias.to_string(), canonical.to_string()));
                }
            }
        }

        // counts keyed by canonical name, first-encounter order preserved
        let mut counts: Vec<GroupCount> = Vec::new();
        for cell in &cells {
            let key = if let Some(first) = cell.split(';').map(str::trim).find(|t| !t.is_empty()) {
                if cell.contains(';') {
                    first.to_string()
                } else {
                    aliases
                        .iter()
                        .find(|(a, _)| a == first)
                        .map(|(_, canon)| canon.clone())
                        .unwrap_or_else(|| first.to_string())
                }
            } else {
                continue;
            };

            match counts.iter_mut().find(|g| g.name == key) {
                Some(g) => g.count += 1,
                None => counts.push(GroupCount {
                    name: key,
                    count: 1,
                }),
            }
        }

        // stable: ties keep first-encountered order
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(TOP_GROUPS);
        debug!(groups = counts.len(), col, "aggregation computed");
        counts
    }
}
