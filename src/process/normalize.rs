//! Row normalization: date parsing, date-column discovery and forward-fill.
//!
//! The sheets record a date once and leave it blank for the directives that
//! follow on the same day, so an empty date cell on a non-empty row means
//! "same day as above". Cells are free text; a date can sit anywhere inside
//! one ("ban hành ngày 05/03/2026 ...").

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::semantics::{role_of, Role};
use super::table::MasterTable;

/// Day-month-year with `/` or `-` separators, 4-digit year.
static DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").expect("dmy pattern"));

/// ISO-ish year-month-day with `-` or `/` separators.
static YMD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("ymd pattern"));

/// How many rows to sample when sniffing the date column by content.
const DATE_SNIFF_ROWS: usize = 100;

/// Extract the first parseable date found anywhere in a cell.
///
/// `D/M/Y` and `D-M-Y` are tried before ISO `Y-M-D`/`Y/M/D`; a cell that
/// matches neither, or matches with an impossible calendar date, yields
/// `None` rather than an error — the sheets are hand-edited.
pub fn parse_cell_date(cell: &str) -> Option<NaiveDate> {
    if let Some(cap) = DMY_RE.captures(cell) {
        let day: u32 = cap[1].parse().ok()?;
        let month: u32 = cap[2].parse().ok()?;
        let year: i32 = cap[3].parse().ok()?;
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(d);
        }
    }
    if let Some(cap) = YMD_RE.captures(cell) {
        let year: i32 = cap[1].parse().ok()?;
        let month: u32 = cap[2].parse().ok()?;
        let day: u32 = cap[3].parse().ok()?;
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(d);
        }
    }
    None
}

fn looks_like_date(cell: &str) -> bool {
    parse_cell_date(cell).is_some()
}

/// Discover the date column of a finished master table, once.
///
/// Header keyword match first; failing that, sample up to the first
/// [`DATE_SNIFF_ROWS`] rows and take the column with the most date-like
/// cells. The reserved provenance column never qualifies.
pub fn detect_date_column(table: &MasterTable) -> Option<usize> {
    for (i, name) in table.schema().iter().enumerate().skip(1) {
        if role_of(name) == Some(Role::Date) {
            return Some(i);
        }
    }

    let mut best: Option<(usize, usize)> = None; // (column, hits)
    for col in 1..table.width() {
        let hits = table
            .rows()
            .iter()
            .take(DATE_SNIFF_ROWS)
            .filter(|row| row.get(col).map(|c| looks_like_date(c)).unwrap_or(false))
            .count();
        if hits > 0 && best.map(|(_, h)| hits > h).unwrap_or(true) {
            best = Some((col, hits));
        }
    }
    if let Some((col, hits)) = best {
        debug!(col, hits, "date column sniffed from row content");
    }
    best.map(|(col, _)| col)
}

/// Forward-fill the date column in place.
///
/// A non-empty date cell updates the carried value; an empty date cell on a
/// row that has content elsewhere receives the carried value; fully-empty
/// rows pass through untouched. Running this twice changes nothing.
pub fn forward_fill_dates(rows: &mut [Vec<String>], date_col: usize) {
    let mut last_seen = String::new();
    for row in rows.iter_mut() {
        let Some(cell) = row.get(date_col) else {
            continue;
        };
        if !cell.trim().is_empty() {
            last_seen = cell.clone();
            continue;
        }
        let has_content = row
            .iter()
            .enumerate()
            .any(|(i, c)| i != date_col && !c.trim().is_empty());
        if has_content && !last_seen.is_empty() {
            row[date_col] = last_seen.clone();
        }
    }
}

/// Detect the date column and forward-fill it. No-op when no column in the
/// table looks date-bearing.
pub fn normalize(table: &mut MasterTable) -> Option<usize> {
    let date_col = detect_date_column(table)?;
    forward_fill_dates(table.rows_mut(), date_col);
    Some(date_col)
}
