use anyhow::{Context, Result};
use ep_core::Member;
use rusqlite::Connection;

use crate::config::IngestConfig;
use crate::db::record_scrape_run;
use crate::directory::DirectoryScraper;
use crate::fetcher::Fetch;
use crate::loader::upsert_members;
use crate::profile::enrich_members;
use crate::scrape::run;

/// Outcome of one ingest run.
#[derive(Debug)]
pub struct IngestSummary {
    pub listed: usize,
    pub stored: usize,
    pub failed: usize,
    pub members: Vec<Member>,
}

/// Scrape the directory, enrich every listed member from their profile and
/// store the result. Every run is recorded in `scrape_run`, including runs
/// where the directory lists nobody.
pub async fn ingest<F>(
    conn: &Connection,
    fetcher: &F,
    config: &IngestConfig,
    run_id: &str,
) -> Result<IngestSummary>
where
    F: Fetch + ?Sized,
{
    tracing::info!("--- Directory ---");
    let directory = DirectoryScraper::new(&config.directory_base_url, config.terms.iter().copied());
    let listed = run(&directory, fetcher, config.concurrency)
        .await
        .context("directory scrape failed")?;
    if listed.is_empty() {
        tracing::warn!("directory listed no members");
        record_scrape_run(conn, run_id, 0, 0)?;
        return Ok(IngestSummary {
            listed: 0,
            stored: 0,
            failed: 0,
            members: Vec::new(),
        });
    }
    upsert_members(conn, &listed)?;

    tracing::info!("--- Profiles ---");
    let (members, failed) =
        enrich_members(&listed, fetcher, &config.profile_base_url, config.concurrency).await;
    let stored = upsert_members(conn, &members)?;
    record_scrape_run(conn, run_id, stored, failed)?;

    Ok(IngestSummary {
        listed: listed.len(),
        stored,
        failed,
        members,
    })
}
