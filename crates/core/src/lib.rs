use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

mod country;

pub use country::{Country, UnknownCountry};

pub const PROJECT_NAME: &str = "ep-members";
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Legislative term number (8 = 2014-2019, 9 = 2019-2024, ...).
pub type Term = u32;

/// A member of parliament as seen by the directory and profile pages.
///
/// `external_id` is the identity key assigned by the directory. A record
/// created from the directory only carries the id and its terms; the
/// biographical fields are filled in by profile enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub external_id: u64,
    pub terms: BTreeSet<Term>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: Option<Country>,
}

impl Member {
    pub fn new(external_id: u64, term: Term) -> Self {
        Self::with_terms(external_id, BTreeSet::from([term]))
    }

    pub fn with_terms(external_id: u64, terms: BTreeSet<Term>) -> Self {
        Self {
            external_id,
            terms,
            first_name: None,
            last_name: None,
            date_of_birth: None,
            country: None,
        }
    }

    /// Union `other`'s terms into this member. Terms are never removed.
    pub fn merge_terms(&mut self, other: &Member) -> &mut Self {
        self.terms.extend(other.terms.iter().copied());
        self
    }

    /// Most recent term, whose profile page is authoritative.
    pub fn latest_term(&self) -> Option<Term> {
        self.terms.last().copied()
    }

    pub fn full_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// Split a full name at the first whitespace run.
///
/// Only a single separator is assumed, so "Jane Van Doe" yields
/// ("Jane", "Van Doe") and a multi-word given name lands in the last name.
/// A single-word name yields an empty last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

/// Members keyed by `external_id`, in first-seen order.
///
/// Inserting a member whose id is already present merges its terms into
/// the existing record instead of adding a second one.
#[derive(Debug, Default)]
pub struct MemberSet {
    members: Vec<Member>,
    index: HashMap<u64, usize>,
}

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, member: Member) {
        match self.index.get(&member.external_id) {
            Some(&pos) => {
                self.members[pos].merge_terms(&member);
            }
            None => {
                self.index.insert(member.external_id, self.members.len());
                self.members.push(member);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_vec(self) -> Vec<Member> {
        self.members
    }
}
