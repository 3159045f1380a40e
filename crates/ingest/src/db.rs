use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS member (
    external_id INTEGER PRIMARY KEY,
    first_name TEXT,
    last_name TEXT,
    date_of_birth TEXT,
    country TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS member_term (
    external_id INTEGER NOT NULL REFERENCES member(external_id) ON DELETE CASCADE,
    term INTEGER NOT NULL,
    UNIQUE(external_id, term)
);

CREATE TABLE IF NOT EXISTS scrape_run (
    id TEXT PRIMARY KEY,
    finished_at TEXT NOT NULL DEFAULT (datetime('now')),
    member_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_member_name ON member(last_name, first_name);
CREATE INDEX IF NOT EXISTS idx_member_term_term ON member_term(term);
"#;

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn record_scrape_run(conn: &Connection, run_id: &str, member_count: usize, failed_count: usize) -> Result<()> {
    conn.execute(
        "INSERT INTO scrape_run (id, member_count, failed_count) VALUES (?1, ?2, ?3)",
        rusqlite::params![run_id, member_count as i64, failed_count as i64],
    )?;
    Ok(())
}
