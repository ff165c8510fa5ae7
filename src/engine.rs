//! Orchestration: serialized full-refresh passes plus cache-first serving.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::Source;
use crate::error::PipelineError;
use crate::fetch::Transport;
use crate::process::{ingest_all, normalize::detect_date_column, Ingested};
use crate::store::{read_table, write_table, RowStore};

/// Owns the source list, the transport and the cache, and hands out
/// finished [`Ingested`] tables.
///
/// Full refreshes are serialized behind an async mutex: the store swap is
/// delete-all + bulk-insert, and interleaved passes would corrupt it.
/// Reads keep serving the previously published table while a refresh is in
/// flight and see the new one only once the pass completes.
pub struct DirectiveEngine<T, S> {
    transport: T,
    store: S,
    sources: Vec<Source>,
    refresh_lock: Mutex<()>,
    current: RwLock<Option<Arc<Ingested>>>,
}

impl<T: Transport, S: RowStore> DirectiveEngine<T, S> {
    pub fn new(transport: T, store: S, sources: Vec<Source>) -> Self {
        Self {
            transport,
            store,
            sources,
            refresh_lock: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    /// Run one full ingestion pass and publish the result.
    ///
    /// Store write failure is logged and swallowed: the fresh in-memory
    /// table is still returned and published for this session.
    pub async fn refresh(&self) -> Result<Arc<Ingested>, PipelineError> {
        let _pass = self.refresh_lock.lock().await;

        let ingested = Arc::new(ingest_all(&self.transport, &self.sources).await?);

        if let Err(err) = write_table(&self.store, &ingested.table) {
            warn!(error = %err, "cache write failed, serving from memory only");
        }

        *self.current.write().await = Some(Arc::clone(&ingested));
        Ok(ingested)
    }

    /// Cache-first load: the already-published table if any, else the
    /// store, else a full refresh.
    pub async fn load(&self) -> Result<Arc<Ingested>, PipelineError> {
        if let Some(current) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(current));
        }

        match read_table(&self.store) {
            Ok(Some(table)) => {
                let date_col = detect_date_column(&table);
                let ingested = Arc::new(Ingested { table, date_col });
                info!(rows = ingested.table.rows().len(), "serving cached table");
                *self.current.write().await = Some(Arc::clone(&ingested));
                Ok(ingested)
            }
            Ok(None) => self.refresh().await,
            Err(err) => {
                warn!(error = %err, "cache unreadable, falling back to full re-fetch");
                self.refresh().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::candidate_urls;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        bodies: HashMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn get(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unreachable: {url}"))
        }
    }

    fn engine_with_one_source() -> DirectiveEngine<CountingTransport, MemoryStore> {
        let source = Source {
            id: "sheet".into(),
            sheet_ref: "0".into(),
            declared_year: 2025,
        };
        let mut bodies = HashMap::new();
        bodies.insert(
            candidate_urls(&source)[0].clone(),
            format!("Ngày,Nội dung\n10/01/2025,giao ban\n{}", ",".repeat(60)),
        );
        DirectiveEngine::new(
            CountingTransport {
                bodies,
                calls: AtomicUsize::new(0),
            },
            MemoryStore::new(),
            vec![source],
        )
    }

    #[tokio::test]
    async fn refresh_publishes_and_load_reuses() {
        let engine = engine_with_one_source();
        let fresh = engine.refresh().await.unwrap();
        assert_eq!(fresh.table.rows().len(), 1);
        let calls_after_refresh = engine.transport.calls.load(Ordering::SeqCst);

        let served = engine.load().await.unwrap();
        assert_eq!(served.table.rows().len(), 1);
        // no new network traffic for a cache-first load
        assert_eq!(
            engine.transport.calls.load(Ordering::SeqCst),
            calls_after_refresh
        );
    }

    #[tokio::test]
    async fn load_reads_store_before_refetching() {
        let engine = engine_with_one_source();
        // warm the store with one pass, then simulate a new session
        let fresh = engine.refresh().await.unwrap();
        *engine.current.write().await = None;
        let calls_after_refresh = engine.transport.calls.load(Ordering::SeqCst);

        let served = engine.load().await.unwrap();
        assert_eq!(served.table.rows(), fresh.table.rows());
        assert_eq!(served.date_col, Some(1));
        assert_eq!(
            engine.transport.calls.load(Ordering::SeqCst),
            calls_after_refresh
        );
    }

    #[tokio::test]
    async fn empty_store_triggers_full_fetch() {
        let engine = engine_with_one_source();
        let served = engine.load().await.unwrap();
        assert_eq!(served.table.rows().len(), 1);
        assert!(engine.transport.calls.load(Ordering::SeqCst) > 0);
    }
}
