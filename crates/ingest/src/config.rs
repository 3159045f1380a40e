use anyhow::{Context, Result};
use ep_core::Term;
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::directory::{DIRECTORY_BASE_URL, KNOWN_TERMS};
use crate::profile::PROFILE_BASE_URL;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub directory_base_url: String,
    pub profile_base_url: String,
    pub terms: BTreeSet<Term>,
    pub timeout: Duration,
    pub retries: usize,
    pub initial_backoff: Duration,
    pub concurrency: usize,
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub export_json: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            directory_base_url: DIRECTORY_BASE_URL.to_string(),
            profile_base_url: PROFILE_BASE_URL.to_string(),
            terms: KNOWN_TERMS.iter().copied().collect(),
            timeout: Duration::from_secs(60),
            retries: 3,
            initial_backoff: Duration::from_millis(1000),
            concurrency: 4,
            user_agent: USER_AGENT.to_string(),
            data_dir: PathBuf::from("data"),
            export_json: None,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            directory_base_url: env::var("EP_DIRECTORY_BASE_URL")
                .unwrap_or(defaults.directory_base_url),
            profile_base_url: env::var("EP_PROFILE_BASE_URL").unwrap_or(defaults.profile_base_url),
            terms: match env::var("EP_TERMS") {
                Ok(raw) => parse_terms(&raw)?,
                Err(_) => defaults.terms,
            },
            timeout: env_parse::<u64>("HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retries: env_parse("FETCH_RETRIES")?.unwrap_or(defaults.retries),
            initial_backoff: env_parse::<u64>("FETCH_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            concurrency: env_parse::<usize>("SCRAPE_CONCURRENCY")?
                .map(|n| n.max(1))
                .unwrap_or(defaults.concurrency),
            user_agent: env::var("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            export_json: env::var("EXPORT_JSON").ok().map(PathBuf::from),
        })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

/// Parse a comma separated list of term numbers, e.g. `"8, 9"`.
pub fn parse_terms(raw: &str) -> Result<BTreeSet<Term>> {
    let terms = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<Term>()
                .ok()
                .filter(|&n| n > 0)
                .with_context(|| format!("invalid term {t:?}"))
        })
        .collect::<Result<BTreeSet<_>>>()?;

    if terms.is_empty() {
        anyhow::bail!("no terms given");
    }
    Ok(terms)
}
