use chrono::NaiveDate;
use ep_core::{split_full_name, Country, Member, Term};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::document::DocumentKind;
use crate::error::{ExtractError, ParseError, ScrapeError};
use crate::fetcher::Fetch;
use crate::scrape::{self, Resources, Scraper};

pub const PROFILE_BASE_URL: &str = "https://www.europarl.europa.eu/meps/en";

// The server ignores the name segment of profile URLs.
const NAME_SEGMENT: &str = "NAME";

static FULL_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#presentationmep div.erpl_title-h1").expect("invalid selector: full name")
});

static BIRTH_DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#birthDate").expect("invalid selector: birth date"));

static SUBTITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#presentationmep div.erpl_title-h3").expect("invalid selector: subtitle")
});

/// Enriches one identity record from its profile pages.
///
/// A page is fetched for every known term, but biographical fields are only
/// read from the most recent one.
#[derive(Debug, Clone)]
pub struct ProfileScraper {
    base_url: String,
    external_id: u64,
    terms: BTreeSet<Term>,
}

impl ProfileScraper {
    pub fn new(base_url: impl Into<String>, external_id: u64, terms: BTreeSet<Term>) -> Self {
        Self {
            base_url: base_url.into(),
            external_id,
            terms,
        }
    }

    pub fn for_member(base_url: impl Into<String>, member: &Member) -> Self {
        Self::new(base_url, member.external_id, member.terms.clone())
    }

    pub fn url_for(&self, term: Term) -> String {
        format!(
            "{}/{}/{}/history/{}",
            self.base_url.trim_end_matches('/'),
            self.external_id,
            NAME_SEGMENT,
            term
        )
    }
}

impl Scraper for ProfileScraper {
    type Key = Term;
    type Output = Member;
    const DOCUMENT_KIND: DocumentKind = DocumentKind::Presentation;

    fn resource_urls(&self) -> BTreeMap<Term, String> {
        self.terms.iter().map(|&term| (term, self.url_for(term))).collect()
    }

    fn extract(&self, resources: &Resources<Term>) -> Result<Member, ScrapeError> {
        let (&term, resource) = resources.iter().next_back().ok_or(ScrapeError::NoResources)?;

        let member = resource
            .document
            .as_presentation()
            .and_then(|html| extract_profile(html, self.external_id, self.terms.clone()))
            .map_err(|e| ScrapeError::extraction(term, &resource.url, e))?;

        tracing::debug!(
            external_id = self.external_id,
            term,
            name = ?member.full_name(),
            country = ?member.country,
            "extracted profile"
        );
        Ok(member)
    }
}

/// Build a fully populated member from a profile page.
pub fn extract_profile(
    html: &Html,
    external_id: u64,
    terms: BTreeSet<Term>,
) -> Result<Member, ExtractError> {
    let (first_name, last_name) = split_full_name(&full_name(html)?);

    Ok(Member {
        external_id,
        terms,
        first_name: Some(first_name),
        last_name: Some(last_name),
        date_of_birth: date_of_birth(html)?,
        country: Some(country(html)?),
    })
}

fn select_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector).next().map(|element| {
        element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn full_name(html: &Html) -> Result<String, ExtractError> {
    select_text(html, &FULL_NAME)
        .filter(|name| !name.is_empty())
        .ok_or(ExtractError::Lookup("full name title"))
}

/// Absent element means unknown, not an error.
fn date_of_birth(html: &Html) -> Result<Option<NaiveDate>, ExtractError> {
    match select_text(html, &BIRTH_DATE) {
        Some(raw) => Ok(Some(parse_birth_date(&raw)?)),
        None => Ok(None),
    }
}

fn country(html: &Html) -> Result<Country, ExtractError> {
    let subtitle = select_text(html, &SUBTITLE).ok_or(ExtractError::Lookup("country subtitle"))?;
    Ok(country_text(&subtitle).parse::<Country>()?)
}

/// Parse a `DD.MM.YYYY` birth date by fixed offsets.
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let raw = raw.trim();
    let malformed = || ParseError::Field {
        field: "date of birth",
        value: raw.to_string(),
    };

    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'.' || bytes[5] != b'.' {
        return Err(malformed());
    }

    let day = digits(&raw[..2]).ok_or_else(malformed)?;
    let month = digits(&raw[3..5]).ok_or_else(malformed)?;
    let year = digits(&raw[6..]).ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(malformed)
}

fn digits(s: &str) -> Option<u32> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Country part of a subtitle such as `"France - Group X"`.
pub fn country_text(subtitle: &str) -> &str {
    subtitle
        .split_once('-')
        .map_or(subtitle, |(country, _)| country)
        .trim()
}

/// Enrich every member from its profile pages.
///
/// Each member is its own unit of failure: a failed profile is logged and
/// counted, the others still come back in input order.
pub async fn enrich_members<F>(
    members: &[Member],
    fetcher: &F,
    base_url: &str,
    concurrency: usize,
) -> (Vec<Member>, usize)
where
    F: Fetch + ?Sized,
{
    let total = members.len();
    let results: Vec<_> = stream::iter(members)
        .map(|member| async move {
            let scraper = ProfileScraper::for_member(base_url, member);
            (member, scrape::run(&scraper, fetcher, 1).await)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut enriched = Vec::with_capacity(total);
    let mut failed = 0;
    for (listed, result) in results {
        match result {
            Ok(member) => enriched.push(member),
            Err(e) => {
                failed += 1;
                tracing::error!(
                    external_id = listed.external_id,
                    term = ?listed.latest_term(),
                    key = e.key().unwrap_or("-"),
                    url = e.url().unwrap_or("-"),
                    error = %e,
                    "failed to scrape profile"
                );
            }
        }
    }

    tracing::info!(total, enriched = enriched.len(), failed, "profiles scraped");
    (enriched, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;
    use crate::scrape::run;

    const BASE: &str = "https://example.test/meps/en";

    fn profile(name: &str, birth_date: Option<&str>, subtitle: &str) -> String {
        let birth = birth_date
            .map(|d| format!(r#"<time class="sln-birth-date" id="birthDate">{d}</time>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body>
            <div id="presentationmep">
                <div class="erpl_title-h1 mt-1">
                    {name}
                </div>
                <div class="erpl_title-h3 mt-1">{subtitle}</div>
                <div>{birth}</div>
            </div>
            </body></html>"#
        )
    }

    fn terms(values: &[Term]) -> BTreeSet<Term> {
        values.iter().copied().collect()
    }

    #[test]
    fn parses_fixed_width_dates() {
        assert_eq!(
            parse_birth_date("01.02.1970").unwrap(),
            NaiveDate::from_ymd_opt(1970, 2, 1).unwrap()
        );
        assert_eq!(
            parse_birth_date(" 15.03.1980\n").unwrap(),
            NaiveDate::from_ymd_opt(1980, 3, 15).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        for raw in ["99.99.9999", "aa.bb.cccc", "1970-02-01", "1.2.1970", "", "+1.02.1970", "01.02.19é0"] {
            assert!(
                matches!(parse_birth_date(raw), Err(ParseError::Field { .. })),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn country_is_text_before_first_hyphen() {
        assert_eq!(country_text("France - Group X"), "France");
        assert_eq!(country_text("  Germany  "), "Germany");
        assert_eq!(country_text("Italy - A - B"), "Italy");
    }

    #[test]
    fn extracts_all_fields() {
        let html = Html::parse_document(&profile("Jane Doe", Some("15.03.1980"), "Germany - Committee Y"));
        let member = extract_profile(&html, 123, terms(&[8, 9])).unwrap();

        assert_eq!(member.first_name.as_deref(), Some("Jane"));
        assert_eq!(member.last_name.as_deref(), Some("Doe"));
        assert_eq!(member.date_of_birth, NaiveDate::from_ymd_opt(1980, 3, 15));
        assert_eq!(member.country, Some(Country::Germany));
    }

    #[test]
    fn missing_birth_date_is_unset() {
        let html = Html::parse_document(&profile("Jane Doe", None, "France - Group X"));
        let member = extract_profile(&html, 1, terms(&[9])).unwrap();
        assert_eq!(member.date_of_birth, None);
        assert_eq!(member.country, Some(Country::France));
    }

    #[test]
    fn required_fields_must_be_present() {
        let html = Html::parse_document("<html><body><h1>Jane Doe</h1></body></html>");
        assert!(matches!(
            extract_profile(&html, 1, terms(&[9])),
            Err(ExtractError::Lookup("full name title"))
        ));

        let html = Html::parse_document(&profile("Jane Doe", None, "Atlantis - Group X"));
        assert!(matches!(
            extract_profile(&html, 1, terms(&[9])),
            Err(ExtractError::UnrecognizedValue(_))
        ));

        let html = Html::parse_document(&profile("Jane Doe", Some("soon"), "France - Group X"));
        assert!(matches!(
            extract_profile(&html, 1, terms(&[9])),
            Err(ExtractError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn reads_latest_term_and_fetches_every_term() {
        let scraper = ProfileScraper::new(BASE, 123, terms(&[8, 9]));
        let fetcher = StaticFetcher::new()
            .with(scraper.url_for(8), profile("Old Name", Some("01.01.1900"), "France - Old"))
            .with(
                scraper.url_for(9),
                profile("Jane Doe", Some("15.03.1980"), "Germany - Committee Y"),
            );

        let member = run(&scraper, &fetcher, 1).await.unwrap();

        assert_eq!(
            member,
            Member {
                external_id: 123,
                terms: terms(&[8, 9]),
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 3, 15),
                country: Some(Country::Germany),
            }
        );
        assert_eq!(
            fetcher.requested(),
            vec![
                format!("{BASE}/123/NAME/history/8"),
                format!("{BASE}/123/NAME/history/9"),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_older_term_fails_the_run() {
        let scraper = ProfileScraper::new(BASE, 123, terms(&[8, 9]));
        let fetcher = StaticFetcher::new().with(
            scraper.url_for(9),
            profile("Jane Doe", None, "Germany - Committee Y"),
        );

        let err = run(&scraper, &fetcher, 1).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { ref key, .. } if key == "8"));
    }

    #[tokio::test]
    async fn no_terms_means_no_resources() {
        let scraper = ProfileScraper::new(BASE, 123, BTreeSet::new());
        let err = run(&scraper, &StaticFetcher::new(), 1).await.unwrap_err();
        assert!(matches!(err, ScrapeError::NoResources));
    }

    #[tokio::test]
    async fn enrich_skips_failed_members() {
        let ok = Member::new(1, 9);
        let broken = Member::new(2, 9);
        let fetcher = StaticFetcher::new().with(
            ProfileScraper::for_member(BASE, &ok).url_for(9),
            profile("Jane Doe", None, "Malta - Group"),
        );

        let (enriched, failed) = enrich_members(&[ok, broken], &fetcher, BASE, 2).await;

        assert_eq!(failed, 1);
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].external_id, 1);
        assert_eq!(enriched[0].country, Some(Country::Malta));
    }
}
