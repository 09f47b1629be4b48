//! Field normalizers shared by the source adapters.
//!
//! All functions here are pure: they never fail and map anything they cannot
//! interpret onto the empty-string sentinel.

use regex::Regex;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const DOI_PREFIXES: [&str; 5] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

static MARKUP_RE: OnceLock<Regex> = OnceLock::new();

fn markup_re() -> &'static Regex {
    MARKUP_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static markup pattern is valid"))
}

/// One component of a partial date as delivered upstream.
///
/// PubMed sends text (`"2024"`, `"Mar"`, `"05"`), Crossref sends integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatePart {
    Number(i64),
    Text(String),
}

impl From<i64> for DatePart {
    fn from(value: i64) -> Self {
        DatePart::Number(value)
    }
}

impl From<i32> for DatePart {
    fn from(value: i32) -> Self {
        DatePart::Number(value.into())
    }
}

impl From<u32> for DatePart {
    fn from(value: u32) -> Self {
        DatePart::Number(value.into())
    }
}

impl From<&str> for DatePart {
    fn from(value: &str) -> Self {
        DatePart::Text(value.to_string())
    }
}

impl From<String> for DatePart {
    fn from(value: String) -> Self {
        DatePart::Text(value)
    }
}

impl DatePart {
    fn as_number(&self) -> Option<i64> {
        match self {
            DatePart::Number(n) => Some(*n),
            DatePart::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_year(&self) -> Option<i64> {
        self.as_number().filter(|y| (1..=9999).contains(y))
    }

    fn as_month(&self) -> Option<i64> {
        if let Some(n) = self.as_number() {
            return Some(n).filter(|m| (1..=12).contains(m));
        }
        match self {
            DatePart::Text(s) => month_from_name(s),
            DatePart::Number(_) => None,
        }
    }

    fn as_day(&self) -> Option<i64> {
        self.as_number().filter(|d| (1..=31).contains(d))
    }
}

/// Match a month name (`"Mar"`, `"march"`, `"SEPT"`) by its first three letters.
pub fn month_from_name(name: &str) -> Option<i64> {
    let prefix: String = name.trim().chars().take(3).collect::<String>().to_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == prefix)
        .map(|idx| idx as i64 + 1)
}

/// Assemble a publication date at the precision the upstream actually knows.
///
/// Produces `YYYY-MM-DD`, `YYYY-MM`, `YYYY` or an empty string. Components that
/// cannot be interpreted are dropped together with everything finer than them,
/// so an unparseable month turns a full date into a year-only date.
pub fn assemble_date(
    year: Option<DatePart>,
    month: Option<DatePart>,
    day: Option<DatePart>,
) -> String {
    let Some(year) = year.as_ref().and_then(DatePart::as_year) else {
        return String::new();
    };

    match (
        month.as_ref().and_then(DatePart::as_month),
        day.as_ref().and_then(DatePart::as_day),
    ) {
        (Some(month), Some(day)) => format!("{:04}-{:02}-{:02}", year, month, day),
        (Some(month), None) => format!("{:04}-{:02}", year, month),
        (None, _) => format!("{:04}", year),
    }
}

/// OpenAlex's word → positions abstract index, entries kept in document order.
///
/// Key order matters: when two words claim the same position, the later key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex(Vec<(String, Vec<u32>)>);

impl InvertedIndex {
    pub fn entries(&self) -> &[(String, Vec<u32>)] {
        &self.0
    }
}

impl<W: Into<String>> FromIterator<(W, Vec<u32>)> for InvertedIndex {
    fn from_iter<I: IntoIterator<Item = (W, Vec<u32>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(w, p)| (w.into(), p)).collect())
    }
}

impl<'de> Deserialize<'de> for InvertedIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = InvertedIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of words to position lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<u32>>()? {
                    entries.push(entry);
                }
                Ok(InvertedIndex(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Rebuild an abstract from an inverted index.
///
/// Words are emitted in strictly ascending position order; if two words claim
/// the same position the one later in the document wins.
pub fn decode_inverted_index(index: Option<&InvertedIndex>) -> String {
    let Some(index) = index else {
        return String::new();
    };

    let mut by_position: BTreeMap<u32, &str> = BTreeMap::new();
    for (word, positions) in index.entries() {
        for position in positions {
            by_position.insert(*position, word.as_str());
        }
    }

    by_position.into_values().collect::<Vec<_>>().join(" ")
}

/// Remove tag-like markup, turn newlines into spaces and trim.
pub fn strip_markup(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    markup_re()
        .replace_all(value, "")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

/// Render an author list as a single `; `-joined string.
pub fn join_authors(authors: &[String]) -> String {
    authors.join("; ")
}

/// Lowercase a DOI and strip any resolver URL or `doi:` prefix.
pub fn normalize_doi(doi: &str) -> String {
    let trimmed = doi.trim();
    let lowered = trimmed.to_lowercase();
    let stripped = DOI_PREFIXES
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))
        .unwrap_or(&lowered);
    stripped.trim().to_string()
}
