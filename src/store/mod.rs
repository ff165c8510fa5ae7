//! Row-indexed cache behind the pipeline.
//!
//! The store only ever holds one table: row 0 is the schema header, the
//! rest are data rows. Replacement is delete-all then bulk-insert; that
//! pair is the atomicity unit, so a reader either sees the old complete
//! table or the new complete one, never a partial mix at the row level
//! the engine cares about.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use crate::error::PipelineError;
use crate::process::table::MasterTable;

/// Rows per bulk-insert call.
pub const INSERT_BATCH: usize = 100;
/// Rows per read page.
pub const READ_PAGE: usize = 1000;

/// One persisted row: explicit index so ordering survives the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRow {
    pub index: usize,
    pub content: Vec<String>,
}

/// The cache contract the pipeline writes through.
pub trait RowStore: Send + Sync {
    fn delete_all(&self) -> Result<()>;
    /// Insert a batch of at most [`INSERT_BATCH`] rows.
    fn bulk_insert(&self, rows: &[StoredRow]) -> Result<()>;
    /// Read one page of at most [`READ_PAGE`] rows starting at `offset`,
    /// ordered by index. An empty page means end of data.
    fn read_page(&self, offset: usize) -> Result<Vec<StoredRow>>;
}

/// Write a finished master table through to the store, batched.
///
/// A failure here is reported as [`PipelineError::StoreWriteFailed`]; the
/// caller keeps using the in-memory table.
pub fn write_table<S: RowStore + ?Sized>(
    store: &S,
    table: &MasterTable,
) -> Result<(), PipelineError> {
    let rows: Vec<StoredRow> = table
        .to_stored_rows()
        .into_iter()
        .enumerate()
        .map(|(index, content)| StoredRow { index, content })
        .collect();

    let inner = || -> Result<()> {
        store.delete_all()?;
        for chunk in rows.chunks(INSERT_BATCH) {
            store.bulk_insert(chunk)?;
        }
        Ok(())
    };
    inner().map_err(|err| PipelineError::StoreWriteFailed(err.into()))?;
    debug!(rows = rows.len(), "table written through to store");
    Ok(())
}

/// Read the whole cached table back, page by page.
///
/// `Ok(None)` means the cache is empty or does not hold a table header;
/// I/O trouble is [`PipelineError::StoreReadFailed`] so the caller can fall
/// back to a full re-fetch.
pub fn read_table<S: RowStore + ?Sized>(store: &S) -> Result<Option<MasterTable>, PipelineError> {
    let mut rows: Vec<StoredRow> = Vec::new();
    loop {
        let page = store
            .read_page(rows.len())
            .map_err(|err| PipelineError::StoreReadFailed(err.into()))?;
        let done = page.len() < READ_PAGE;
        rows.extend(page);
        if done {
            break;
        }
    }
    rows.sort_by_key(|r| r.index);
    Ok(MasterTable::from_stored_rows(
        rows.into_iter().map(|r| r.content).collect(),
    ))
}

/// JSON-lines file store, one `StoredRow` per line. Fine for a cache of a
/// few thousand directive rows; the mutex serializes writers within this
/// process.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl RowStore for JsonFileStore {
    fn delete_all(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache dir for {}", self.path.display()))?;
        }
        File::create(&self.path)
            .with_context(|| format!("truncating {}", self.path.display()))?;
        Ok(())
    }

    fn bulk_insert(&self, rows: &[StoredRow]) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {} for append", self.path.display()))?;
        let mut w = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut w, row).context("encoding stored row")?;
            w.write_all(b"\n")?;
        }
        w.flush().context("flushing store file")?;
        Ok(())
    }

    fn read_page(&self, offset: usize) -> Result<Vec<StoredRow>> {
        let _guard = self.lock.lock().unwrap();
        let file = File::open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines().skip(offset).take(READ_PAGE) {
            let line = line.context("reading store line")?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line).context("decoding stored row")?);
        }
        Ok(out)
    }
}

/// In-memory store for tests and for running without a cache path.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowStore for MemoryStore {
    fn delete_all(&self) -> Result<()> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }

    fn bulk_insert(&self, rows: &[StoredRow]) -> Result<()> {
        self.rows.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    fn read_page(&self, offset: usize) -> Result<Vec<StoredRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().skip(offset).take(READ_PAGE).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_table() -> MasterTable {
        let mut t = MasterTable::new();
        t.seed_schema(&["Date".into(), "Content".into()]);
        for i in 0..250 {
            t.push_row(vec![
                "2025".to_string(),
                format!("{}/1/2025", i % 28 + 1),
                format!("directive {i}"),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn file_store_round_trips_a_table() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().join("cache/rows.jsonl"));
        let table = sample_table();

        write_table(&store, &table)?;
        let back = read_table(&store)?.expect("cached table");

        assert_eq!(back.schema(), table.schema());
        assert_eq!(back.rows().len(), table.rows().len());
        assert_eq!(back.rows()[249][2], "directive 249");
        Ok(())
    }

    #[test]
    fn write_replaces_previous_table() -> Result<()> {
        let store = MemoryStore::new();
        write_table(&store, &sample_table())?;

        let mut small = MasterTable::new();
        small.seed_schema(&["Date".into()]);
        small
            .push_row(vec!["2026".into(), "1/1/2026".into()])
            .unwrap();
        write_table(&store, &small)?;

        let back = read_table(&store)?.unwrap();
        assert_eq!(back.rows().len(), 1);
        assert_eq!(back.schema(), &["Source_Year", "Date"]);
        Ok(())
    }

    #[test]
    fn reading_a_missing_cache_is_a_store_read_error() {
        let store = JsonFileStore::new("/definitely/not/a/real/path.jsonl");
        let err = read_table(&store).unwrap_err();
        assert!(matches!(err, PipelineError::StoreReadFailed(_)));
    }

    #[test]
    fn empty_store_reads_as_no_table() -> Result<()> {
        let store = MemoryStore::new();
        assert!(read_table(&store)?.is_none());
        Ok(())
    }
}
