//! Header-row detection.
//!
//! The yearly sheets open with a variable number of title/blank rows before
//! the real header. Missing the header corrupts the whole source, so the
//! rules here favor recall: a garbage match still yields a usable (if
//! oddly-named) schema, a miss does not.

use tracing::debug;

use super::semantics::{text_mentions_role, Role};

/// Only the top of the sheet is ever scanned.
const MAX_SCAN_ROWS: usize = 10;

/// Locate the header row of a raw grid.
///
/// A row qualifies if its cells, joined and lowercased, mention a date-role
/// keyword together with a content-role keyword, or mention an owner-role
/// keyword on its own. Falls back to row 0; never fails.
pub fn locate_header(grid: &[Vec<String>]) -> usize {
    for (i, row) in grid.iter().take(MAX_SCAN_ROWS).enumerate() {
        let joined = row.join(" ").to_lowercase();
        if joined.trim().is_empty() {
            continue;
        }
        let has_date = text_mentions_role(&joined, Role::Date);
        let has_content = text_mentions_role(&joined, Role::Content);
        let has_owner = text_mentions_role(&joined, Role::Owner);
        if (has_date && has_content) || has_owner {
            debug!(row = i, "header row located");
            return i;
        }
    }
    debug!("no header row matched, defaulting to row 0");
    0
}
