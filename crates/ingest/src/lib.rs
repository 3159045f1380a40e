pub mod config;
pub mod db;
pub mod directory;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod pipeline;
pub mod profile;
pub mod scrape;

pub use config::IngestConfig;
pub use db::{init_schema, open_db, record_scrape_run};
pub use directory::DirectoryScraper;
pub use document::{DocumentKind, ParsedDocument, XmlElement};
pub use error::{ExtractError, FetchError, ParseError, ScrapeError};
pub use fetcher::{Fetch, HttpFetcher, StaticFetcher};
pub use loader::{load_members, upsert_members};
pub use pipeline::{ingest, IngestSummary};
pub use profile::{enrich_members, ProfileScraper};
pub use scrape::{run, Resource, Resources, Scraper};
