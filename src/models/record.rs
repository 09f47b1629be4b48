//! Record model: the common schema every source adapter maps onto.

use std::fmt;
use std::str::FromStr;

use crate::utils::normalize_doi;

/// The upstream API a record was harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    PubMed,
    Crossref,
    OpenAlex,
}

impl SourceKind {
    /// All supported sources, in their default query order
    pub const ALL: [SourceKind; 3] = [SourceKind::PubMed, SourceKind::Crossref, SourceKind::OpenAlex];

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::PubMed => "PubMed",
            SourceKind::Crossref => "Crossref",
            SourceKind::OpenAlex => "OpenAlex",
        }
    }

    /// Returns the source identifier used on the command line
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::PubMed => "pubmed",
            SourceKind::Crossref => "crossref",
            SourceKind::OpenAlex => "openalex",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a source name does not match any adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSource(wanted.to_string()))
    }
}

/// A normalized bibliographic record.
///
/// Every field is a plain string (or list of strings); an empty string means
/// the upstream did not provide the value. Records are built once through
/// [`RecordBuilder`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    source: SourceKind,
    keyword: String,
    title: String,
    authors: Vec<String>,
    doi: String,
    publication_date: String,
    journal: String,
    r#abstract: String,
}

impl Record {
    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author display names in upstream listing order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Authors rendered as a single `; `-separated string
    pub fn authors_joined(&self) -> String {
        crate::utils::join_authors(&self.authors)
    }

    /// Lowercase DOI without URL prefix, or empty
    pub fn doi(&self) -> &str {
        &self.doi
    }

    /// `YYYY-MM-DD`, `YYYY-MM`, `YYYY` or empty
    pub fn publication_date(&self) -> &str {
        &self.publication_date
    }

    pub fn journal(&self) -> &str {
        &self.journal
    }

    pub fn abstract_text(&self) -> &str {
        &self.r#abstract
    }

    /// Key used to detect the same work reported by several sources.
    pub fn identity_key(&self) -> IdentityKey {
        if !self.doi.is_empty() {
            return IdentityKey::Doi(self.doi.to_lowercase());
        }

        let title = self
            .title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        IdentityKey::TitleDate {
            title,
            date: self.publication_date.clone(),
        }
    }

    /// The eight output columns, in header order
    pub fn to_row(&self) -> [String; 8] {
        [
            self.source.name().to_string(),
            self.keyword.clone(),
            self.title.clone(),
            self.authors_joined(),
            self.doi.clone(),
            self.publication_date.clone(),
            self.journal.clone(),
            self.r#abstract.clone(),
        ]
    }
}

/// Identity of a record for deduplication purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Lowercased DOI
    Doi(String),
    /// Fallback when no DOI is known: normalized title plus publication date
    TitleDate { title: String, date: String },
}

/// Builder for constructing Record values
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Create a new builder with the provenance fields
    pub fn new(source: SourceKind, keyword: impl Into<String>) -> Self {
        Self {
            record: Record {
                source,
                keyword: keyword.into(),
                title: String::new(),
                authors: Vec::new(),
                doi: String::new(),
                publication_date: String::new(),
                journal: String::new(),
                r#abstract: String::new(),
            },
        }
    }

    /// Set title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = title.into();
        self
    }

    /// Set authors
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.record.authors = authors;
        self
    }

    /// Set DOI; URL prefixes are stripped and the value lowercased
    pub fn doi(mut self, doi: impl AsRef<str>) -> Self {
        self.record.doi = normalize_doi(doi.as_ref());
        self
    }

    /// Set publication date
    pub fn publication_date(mut self, date: impl Into<String>) -> Self {
        self.record.publication_date = date.into();
        self
    }

    /// Set journal
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.record.journal = journal.into();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = abstract_text.into();
        self
    }

    /// Build the Record
    pub fn build(self) -> Record {
        self.record
    }
}
