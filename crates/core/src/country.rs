use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Countries that send members to the parliament.
///
/// The set is closed: free text that does not name one of these fails to
/// parse with [`UnknownCountry`] rather than mapping to a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    Austria,
    Belgium,
    Bulgaria,
    Croatia,
    Cyprus,
    Czechia,
    Denmark,
    Estonia,
    Finland,
    France,
    Germany,
    Greece,
    Hungary,
    Ireland,
    Italy,
    Latvia,
    Lithuania,
    Luxembourg,
    Malta,
    Netherlands,
    Poland,
    Portugal,
    Romania,
    Slovakia,
    Slovenia,
    Spain,
    Sweden,
    UnitedKingdom,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized country {0:?}")]
pub struct UnknownCountry(pub String);

// (country, ISO 3166-1 alpha-2, English name, other accepted spellings)
const COUNTRIES: &[(Country, &str, &str, &[&str])] = &[
    (Country::Austria, "AT", "Austria", &["osterreich"]),
    (Country::Belgium, "BE", "Belgium", &["belgique", "belgie"]),
    (Country::Bulgaria, "BG", "Bulgaria", &[]),
    (Country::Croatia, "HR", "Croatia", &["hrvatska"]),
    (Country::Cyprus, "CY", "Cyprus", &[]),
    (Country::Czechia, "CZ", "Czechia", &["czech republic", "cesko"]),
    (Country::Denmark, "DK", "Denmark", &["danmark"]),
    (Country::Estonia, "EE", "Estonia", &["eesti"]),
    (Country::Finland, "FI", "Finland", &["suomi"]),
    (Country::France, "FR", "France", &[]),
    (Country::Germany, "DE", "Germany", &["deutschland"]),
    (Country::Greece, "GR", "Greece", &["hellas"]),
    (Country::Hungary, "HU", "Hungary", &["magyarorszag"]),
    (Country::Ireland, "IE", "Ireland", &["eire"]),
    (Country::Italy, "IT", "Italy", &["italia"]),
    (Country::Latvia, "LV", "Latvia", &["latvija"]),
    (Country::Lithuania, "LT", "Lithuania", &["lietuva"]),
    (Country::Luxembourg, "LU", "Luxembourg", &[]),
    (Country::Malta, "MT", "Malta", &[]),
    (Country::Netherlands, "NL", "Netherlands", &["the netherlands", "nederland"]),
    (Country::Poland, "PL", "Poland", &["polska"]),
    (Country::Portugal, "PT", "Portugal", &[]),
    (Country::Romania, "RO", "Romania", &[]),
    (Country::Slovakia, "SK", "Slovakia", &["slovensko"]),
    (Country::Slovenia, "SI", "Slovenia", &["slovenija"]),
    (Country::Spain, "ES", "Spain", &["espana"]),
    (Country::Sweden, "SE", "Sweden", &["sverige"]),
    (Country::UnitedKingdom, "GB", "United Kingdom", &["uk", "great britain"]),
];

impl Country {
    pub fn iso_code(self) -> &'static str {
        self.entry().1
    }

    pub fn name(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (Country, &'static str, &'static str, &'static [&'static str]) {
        // Table rows follow declaration order.
        &COUNTRIES[self as usize]
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Country {
    type Err = UnknownCountry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        if key.is_empty() {
            return Err(UnknownCountry(s.to_string()));
        }

        COUNTRIES
            .iter()
            .find(|(_, iso, name, aliases)| {
                key.eq_ignore_ascii_case(iso)
                    || key == name.to_lowercase()
                    || aliases.contains(&key.as_str())
            })
            .map(|(country, ..)| *country)
            .ok_or_else(|| UnknownCountry(s.trim().to_string()))
    }
}

fn normalize(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| !matches!(c, '\u{0300}'..='\u{036F}'))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
