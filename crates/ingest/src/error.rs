use ep_core::UnknownCountry;
use std::fmt;

use crate::document::DocumentKind;

/// The remote call failed or answered with a non-success status.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
}

impl FetchError {
    /// Transport failures and 5xx answers are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => !e.is_builder() && !e.is_redirect(),
            FetchError::Status(code) => *code >= 500,
        }
    }
}

/// Raw text that could not be turned into a tree, or a field whose text
/// could not be converted to its target type.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document ended inside <{0}>")]
    Unclosed(String),
    #[error("closing tag </{0}> without matching opening tag")]
    Unmatched(String),
    #[error("content after the root element <{0}>")]
    TrailingContent(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("malformed {field}: {value:?}")]
    Field { field: &'static str, value: String },
}

/// Failure inside a single document, before the key and URL are known.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("expected a {0:?} document")]
    UnexpectedDocument(DocumentKind),
    #[error("missing {0}")]
    Lookup(&'static str),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    UnrecognizedValue(#[from] UnknownCountry),
}

/// Failure of a whole scraper run, tagged with the resource being processed.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url} (key {key})")]
    Fetch {
        key: String,
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to parse {url} (key {key})")]
    Parse {
        key: String,
        url: String,
        #[source]
        source: ParseError,
    },
    #[error("missing {what} in {url} (key {key})")]
    Lookup {
        key: String,
        url: String,
        what: &'static str,
    },
    #[error("unrecognized value in {url} (key {key})")]
    UnrecognizedValue {
        key: String,
        url: String,
        #[source]
        source: UnknownCountry,
    },
    #[error("{url} (key {key}) is not a {expected:?} document")]
    UnexpectedDocument {
        key: String,
        url: String,
        expected: DocumentKind,
    },
    #[error("no resources to extract from")]
    NoResources,
}

impl ScrapeError {
    pub fn extraction(key: impl fmt::Display, url: &str, err: ExtractError) -> Self {
        let key = key.to_string();
        let url = url.to_string();
        match err {
            ExtractError::UnexpectedDocument(expected) => {
                ScrapeError::UnexpectedDocument { key, url, expected }
            }
            ExtractError::Lookup(what) => ScrapeError::Lookup { key, url, what },
            ExtractError::Parse(source) => ScrapeError::Parse { key, url, source },
            ExtractError::UnrecognizedValue(source) => {
                ScrapeError::UnrecognizedValue { key, url, source }
            }
        }
    }

    /// Resource key the failure happened on, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            ScrapeError::Fetch { key, .. }
            | ScrapeError::Parse { key, .. }
            | ScrapeError::Lookup { key, .. }
            | ScrapeError::UnrecognizedValue { key, .. }
            | ScrapeError::UnexpectedDocument { key, .. } => Some(key),
            ScrapeError::NoResources => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ScrapeError::Fetch { url, .. }
            | ScrapeError::Parse { url, .. }
            | ScrapeError::Lookup { url, .. }
            | ScrapeError::UnrecognizedValue { url, .. }
            | ScrapeError::UnexpectedDocument { url, .. } => Some(url),
            ScrapeError::NoResources => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_keep_their_kind() {
        let err = ScrapeError::extraction(9, "https://example.test/9", ExtractError::Lookup("title"));
        assert!(matches!(err, ScrapeError::Lookup { what: "title", .. }));
        assert_eq!(err.key(), Some("9"));
        assert_eq!(err.url(), Some("https://example.test/9"));

        let parse = ParseError::Field {
            field: "date of birth",
            value: "99.99.9999".into(),
        };
        let err = ScrapeError::extraction(8, "u", ExtractError::from(parse));
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn status_errors_are_transient_only_on_server_side() {
        assert!(FetchError::Status(503).is_transient());
        assert!(!FetchError::Status(404).is_transient());
    }

    #[test]
    fn messages_name_key_and_url() {
        let err = ScrapeError::Fetch {
            key: "8".into(),
            url: "https://example.test/?leg=8".into(),
            source: FetchError::Status(500),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.test/?leg=8 (key 8)"
        );
    }
}
