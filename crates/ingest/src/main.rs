use anyhow::{Context, Result};
use ep_core::{PROJECT_NAME, PROJECT_VERSION};
use ingest::{ingest, init_schema, open_db, HttpFetcher, IngestConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const DB_FILE: &str = "members.db";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = IngestConfig::from_env()?;
    let run_id = Uuid::new_v4().to_string();
    let db_path = config.data_dir.join(DB_FILE);

    tracing::info!(
        project = PROJECT_NAME,
        version = PROJECT_VERSION,
        run_id = %run_id,
        terms = ?config.terms,
        db = %db_path.display(),
        "starting member ingest"
    );

    let conn = open_db(&db_path)?;
    init_schema(&conn)?;
    let fetcher = HttpFetcher::new(&config).context("failed to build HTTP client")?;

    let summary = ingest(&conn, &fetcher, &config, &run_id).await?;

    if let Some(path) = &config.export_json {
        let json = serde_json::to_string_pretty(&summary.members)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), count = summary.members.len(), "exported members");
    }

    tracing::info!(
        run_id = %run_id,
        listed = summary.listed,
        enriched = summary.stored,
        failed = summary.failed,
        "ingest complete"
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
