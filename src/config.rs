//! Deploy-time configuration: the yearly source list and the cache path.
//!
//! Loaded from YAML when a file is given, otherwise the compiled-in
//! defaults apply. Sheet IDs here are deployment data, not code; the
//! defaults only exist so a fresh checkout runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One logical yearly feed. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Spreadsheet document id.
    pub id: String,
    /// Sheet (tab) reference within the document, e.g. a gid.
    pub sheet_ref: String,
    /// Fiscal year this sheet covers; becomes the provenance tag.
    pub declared_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sources in ingestion order. Order matters: schema reconciliation for
    /// source n depends on the schema built by sources 1..n-1.
    pub sources: Vec<Source>,
    /// Path of the local row cache.
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

fn default_store_path() -> String {
    "cache/directives.jsonl".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![
                Source {
                    id: "REPLACE_WITH_SHEET_ID".into(),
                    sheet_ref: "0".into(),
                    declared_year: 2025,
                },
                Source {
                    id: "REPLACE_WITH_SHEET_ID".into(),
                    sheet_ref: "1".into(),
                    declared_year: 2026,
                },
            ],
            store_path: default_store_path(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }
}
