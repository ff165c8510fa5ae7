//! Schema reconciliation: fold one source grid at a time into the master
//! table, mapping each source column onto a master slot.
//!
//! Mapping order per source column:
//!   1. semantic match — the column's role (date/content/owner) against the
//!      first master column claiming the same role;
//!   2. exact name match, case-insensitive and trimmed;
//!   3. a brand-new master column, with empty-cell backfill of prior rows.
//!
//! Two differently-labeled source columns that both carry the same role
//! therefore land in the same master slot, which is exactly what keeps the
//! cross-year table queryable.

use tracing::debug;

use super::semantics::role_of;
use super::table::MasterTable;
use crate::error::PipelineError;

/// Ingest one source grid into the master table.
///
/// `header_index` comes from the header locator; rows above it are title
/// artifacts and are discarded, as are fully-empty body rows.
pub fn reconcile(
    master: &mut MasterTable,
    grid: &[Vec<String>],
    header_index: usize,
    source_year: i32,
) -> Result<(), PipelineError> {
    let Some(headers) = grid.get(header_index) else {
        return Ok(());
    };
    let headers = headers.clone();
    let body = &grid[header_index + 1..];
    let year = source_year.to_string();

    if master.is_empty() {
        master.seed_schema(&headers);
        for row in body.iter().filter(|r| !is_blank(r)) {
            let mut out = Vec::with_capacity(master.width());
            out.push(year.clone());
            out.extend(row.iter().map(|c| c.clone()));
            out.resize(master.width(), String::new());
            master.push_row(out)?;
        }
        debug!(year = source_year, cols = master.width(), "seeded master schema");
        return Ok(());
    }

    // Resolve every source column to a master slot up front, growing the
    // schema as needed, so row building is a straight copy.
    let slots: Vec<usize> = headers
        .iter()
        .map(|h| resolve_slot(master, h))
        .collect();

    for row in body.iter().filter(|r| !is_blank(r)) {
        let mut out = vec![String::new(); master.width()];
        out[0] = year.clone();
        for (src_idx, &slot) in slots.iter().enumerate() {
            if let Some(cell) = row.get(src_idx) {
                if !cell.is_empty() {
                    out[slot] = cell.clone();
                }
            }
        }
        master.push_row(out)?;
    }

    Ok(())
}

/// Find (or create) the master column a source header maps onto.
fn resolve_slot(master: &mut MasterTable, source_header: &str) -> usize {
    // semantic match: same role on both sides, first master claimant wins
    if let Some(role) = role_of(source_header) {
        let hit = master
            .schema()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, name)| role_of(name) == Some(role));
        if let Some((idx, _)) = hit {
            return idx;
        }
    }

    // exact name match, case-insensitive and trimmed
    let wanted = source_header.trim().to_lowercase();
    if !wanted.is_empty() {
        let hit = master
            .schema()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, name)| name.trim().to_lowercase() == wanted);
        if let Some((idx, _)) = hit {
            return idx;
        }
    }

    let idx = master.push_column(source_header);
    debug!(column = source_header, slot = idx, "appended new master column");
    idx
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
