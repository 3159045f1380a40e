//! Fetch-parse-extract template shared by every scraper.
//!
//! A [`Scraper`] only says which resources it needs and how to read them;
//! [`run`] does the fetching and parsing. A run is all-or-nothing: the first
//! resource that fails to fetch or parse aborts it, and extraction only
//! starts once every resource is in hand.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::fmt;

use crate::document::{DocumentKind, ParsedDocument};
use crate::error::ScrapeError;
use crate::fetcher::Fetch;

/// A parsed resource together with the URL it came from.
#[derive(Debug)]
pub struct Resource {
    pub url: String,
    pub document: ParsedDocument,
}

pub type Resources<K> = BTreeMap<K, Resource>;

pub trait Scraper {
    /// Discriminator for resources, e.g. a term number.
    type Key: Ord + Clone + fmt::Display + Send + Sync;
    type Output;

    /// Parser family used for every resource of this scraper.
    const DOCUMENT_KIND: DocumentKind;

    fn resource_urls(&self) -> BTreeMap<Self::Key, String>;

    fn extract(&self, resources: &Resources<Self::Key>) -> Result<Self::Output, ScrapeError>;
}

/// Fetch every resource of `scraper` (at most `concurrency` at a time),
/// parse them and hand the keyed set to [`Scraper::extract`].
pub async fn run<S, F>(scraper: &S, fetcher: &F, concurrency: usize) -> Result<S::Output, ScrapeError>
where
    S: Scraper + ?Sized,
    F: Fetch + ?Sized,
{
    let urls = scraper.resource_urls();
    tracing::debug!(resources = urls.len(), "fetching resources");

    let fetched: Vec<(S::Key, String, String)> = stream::iter(urls)
        .map(|(key, url)| async move {
            match fetcher.fetch(&url).await {
                Ok(raw) => Ok((key, url, raw)),
                Err(source) => {
                    tracing::warn!(key = %key, url = %url, error = %source, "fetch failed");
                    Err(ScrapeError::Fetch {
                        key: key.to_string(),
                        url,
                        source,
                    })
                }
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut resources = Resources::new();
    for (key, url, raw) in fetched {
        let document = match ParsedDocument::parse(S::DOCUMENT_KIND, &raw) {
            Ok(document) => document,
            Err(source) => {
                return Err(ScrapeError::Parse {
                    key: key.to_string(),
                    url,
                    source,
                })
            }
        };
        resources.insert(key, Resource { url, document });
    }

    scraper.extract(&resources)
}
