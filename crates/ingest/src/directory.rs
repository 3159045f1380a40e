use ep_core::{Member, MemberSet, Term};
use std::collections::{BTreeMap, BTreeSet};

use crate::document::{DocumentKind, XmlElement};
use crate::error::{ExtractError, ParseError, ScrapeError};
use crate::scrape::{Resources, Scraper};

pub const DIRECTORY_BASE_URL: &str = "https://www.europarl.europa.eu/meps/en/directory/xml";
pub const KNOWN_TERMS: &[Term] = &[8, 9];

const RECORD_TAG: &str = "mep";
const ID_TAG: &str = "id";

/// Lists the members of every term and merges them by external id.
///
/// Output order is first-seen order over the terms in ascending order.
#[derive(Debug, Clone)]
pub struct DirectoryScraper {
    base_url: String,
    terms: BTreeSet<Term>,
}

impl DirectoryScraper {
    pub fn new(base_url: impl Into<String>, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            base_url: base_url.into(),
            terms: terms.into_iter().collect(),
        }
    }

    pub fn url_for(&self, term: Term) -> String {
        format!("{}/?leg={}", self.base_url.trim_end_matches('/'), term)
    }
}

impl Default for DirectoryScraper {
    fn default() -> Self {
        Self::new(DIRECTORY_BASE_URL, KNOWN_TERMS.iter().copied())
    }
}

impl Scraper for DirectoryScraper {
    type Key = Term;
    type Output = Vec<Member>;
    const DOCUMENT_KIND: DocumentKind = DocumentKind::Tagged;

    fn resource_urls(&self) -> BTreeMap<Term, String> {
        self.terms.iter().map(|&term| (term, self.url_for(term))).collect()
    }

    fn extract(&self, resources: &Resources<Term>) -> Result<Vec<Member>, ScrapeError> {
        let mut members = MemberSet::new();

        for (&term, resource) in resources {
            let ids = resource
                .document
                .as_tagged()
                .and_then(listed_ids)
                .map_err(|e| ScrapeError::extraction(term, &resource.url, e))?;

            if ids.is_empty() {
                tracing::warn!(term, url = %resource.url, "directory lists no members");
            }
            tracing::info!(term, listed = ids.len(), "parsed directory");

            for id in ids {
                members.insert(Member::new(id, term));
            }
        }

        if members.is_empty() {
            tracing::warn!(terms = resources.len(), "no term lists any members");
        }
        tracing::info!(count = members.len(), "merged directory members");
        Ok(members.into_vec())
    }
}

/// External ids of every record in a directory document, in document order.
pub fn listed_ids(root: &XmlElement) -> Result<Vec<u64>, ExtractError> {
    root.children_named(RECORD_TAG)
        .map(|record| {
            let raw = record
                .child(ID_TAG)
                .ok_or(ExtractError::Lookup("<id> in directory record"))?
                .text()
                .trim();

            raw.parse::<u64>().map_err(|_| {
                ExtractError::Parse(ParseError::Field {
                    field: "external id",
                    value: raw.to_string(),
                })
            })
        })
        .collect()
}
