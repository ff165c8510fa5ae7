use anyhow::Result;
use sheetscraper::{
    config::Config,
    engine::DirectiveEngine,
    fetch::HttpTransport,
    query::{Filter, QueryEngine},
    store::JsonFileStore,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    info!(sources = config.sources.len(), store = %config.store_path, "configured");

    // ─── 3) run one full ingestion pass ──────────────────────────────
    let engine = DirectiveEngine::new(
        HttpTransport::new()?,
        JsonFileStore::new(&config.store_path),
        config.sources,
    );
    let ingested = engine.refresh().await?;
    info!(
        rows = ingested.table.rows().len(),
        cols = ingested.table.width(),
        "master table built"
    );

    // ─── 4) summary for the console ──────────────────────────────────
    let query = QueryEngine::new(&ingested.table, ingested.date_col);
    let all = query.filter_rows(&Filter::default());
    println!("schema: {}", query.schema().join(" | "));
    println!("rows:   {}", all.len());
    for group in query.aggregate(&all) {
        println!("{:>6}  {}", group.count, group.name);
    }

    Ok(())
}
