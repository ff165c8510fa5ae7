//! The ingestion pipeline: fetch every configured source in order, parse,
//! locate headers, reconcile into one master table, then normalize rows.
//!
//! Sources are processed strictly sequentially: reconciliation of source n
//! depends on the schema built by sources 1..n-1, so there is nothing to
//! parallelize and no shared mutable state to guard.

pub mod csv;
pub mod header;
pub mod normalize;
pub mod reconcile;
pub mod semantics;
pub mod table;

use tracing::{info, warn};

use crate::config::Source;
use crate::error::PipelineError;
use crate::fetch::{fetch_source_csv, Transport};
use table::MasterTable;

/// A finished ingestion pass: the reconciled table plus its resolved date
/// column, ready for the query engine.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: MasterTable,
    pub date_col: Option<usize>,
}

/// Run one full ingestion pass over `sources`, in order.
///
/// A source that cannot be fetched or yields nothing contributes zero rows
/// and the pass continues; only all sources failing is fatal
/// ([`PipelineError::AllSourcesFailed`]).
pub async fn ingest_all<T: Transport + ?Sized>(
    transport: &T,
    sources: &[Source],
) -> Result<Ingested, PipelineError> {
    let mut master = MasterTable::new();
    let mut reached = 0usize;

    for source in sources {
        let text = match fetch_source_csv(transport, source).await {
            Ok(text) => text,
            Err(err) => {
                warn!(year = source.declared_year, error = %err, "skipping source");
                continue;
            }
        };
        reached += 1;

        let grid = csv::parse_csv(&text);
        if grid.is_empty() {
            warn!(year = source.declared_year, "source parsed to an empty grid");
            continue;
        }
        let header_index = header::locate_header(&grid);
        reconcile::reconcile(&mut master, &grid, header_index, source.declared_year)?;
        info!(
            year = source.declared_year,
            header_row = header_index,
            total_rows = master.rows().len(),
            cols = master.width(),
            "source reconciled"
        );
    }

    if reached == 0 && !sources.is_empty() {
        return Err(PipelineError::AllSourcesFailed);
    }

    let date_col = normalize::normalize(&mut master);
    info!(
        rows = master.rows().len(),
        cols = master.width(),
        ?date_col,
        "ingestion pass complete"
    );
    Ok(Ingested {
        table: master,
        date_col,
    })
}
