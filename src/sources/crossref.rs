//! Crossref research source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{Record, RecordBuilder, SourceKind};
use crate::sources::{Source, SourceError};
use crate::utils::{assemble_date, strip_markup, DatePart, HttpClient};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Date fields tried in order when picking a publication date
const DATE_FIELDS: [&str; 4] = ["published-print", "published-online", "issued", "created"];

/// Crossref research source
///
/// Uses the Crossref REST API `/works` endpoint, restricted to journal
/// articles and sorted newest first.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
    max_results: usize,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(client: Arc<HttpClient>, max_results: usize) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_BASE.to_string(),
            max_results,
            mailto: None,
        }
    }

    /// Identify ourselves for Crossref's polite pool
    pub fn with_mailto(mut self, email: Option<String>) -> Self {
        self.mailto = email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Point the source at a different API host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_search_url(&self, keyword: &str) -> String {
        let mut url = format!(
            "{}/works?query={}&filter=type:journal-article&sort=published&order=desc&rows={}",
            self.base_url,
            urlencoding::encode(keyword),
            self.max_results
        );
        if let Some(email) = &self.mailto {
            url = format!("{}&mailto={}", url, urlencoding::encode(email));
        }
        url
    }

    /// Parse a `/works` response body into records
    pub fn parse_response(json: &str, keyword: &str) -> Result<Vec<Record>, SourceError> {
        let data: CRResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Failed to parse Crossref JSON: {}", e)))?;

        Ok(data
            .message
            .items
            .into_iter()
            .map(|item| Self::parse_item(item, keyword))
            .collect())
    }

    fn parse_item(item: CRItem, keyword: &str) -> Record {
        let title = item.title.map(TextList::joined).unwrap_or_default();
        let journal = item.container_title.map(TextList::joined).unwrap_or_default();

        let authors = item
            .author
            .unwrap_or_default()
            .iter()
            .filter_map(CRAuthor::display_name)
            .collect();

        let publication_date = DATE_FIELDS
            .iter()
            .filter_map(|field| item.dates.get(*field))
            .map(render_date_parts)
            .find(|date| !date.is_empty())
            .unwrap_or_default();

        RecordBuilder::new(SourceKind::Crossref, keyword)
            .title(strip_markup(&title))
            .authors(authors)
            .doi(item.doi.unwrap_or_default())
            .publication_date(publication_date)
            .journal(strip_markup(&journal))
            .abstract_text(strip_markup(item.r#abstract.as_deref().unwrap_or_default()))
            .build()
    }
}

#[async_trait]
impl Source for CrossrefSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crossref
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Record>, SourceError> {
        tracing::info!("Querying Crossref for '{}'", keyword);

        let body = self
            .client
            .get_text(&self.build_search_url(keyword), self.name())
            .await?;

        let records = Self::parse_response(&body, keyword)?;
        tracing::debug!("Crossref returned {} records for '{}'", records.len(), keyword);
        Ok(records)
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

/// Crossref returns `title` and `container-title` as lists of one string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextList {
    One(String),
    Many(Vec<String>),
}

impl TextList {
    fn joined(self) -> String {
        match self {
            TextList::One(s) => s.trim().to_string(),
            TextList::Many(parts) => parts.join(" ").trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

impl CRAuthor {
    /// "Given Family", else the literal name; `None` if neither exists
    fn display_name(&self) -> Option<String> {
        let joined = [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !joined.is_empty() {
            return Some(joined);
        }

        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct CRItem {
    title: Option<TextList>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    author: Option<Vec<CRAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<TextList>,
    r#abstract: Option<String>,
    /// `published-print`, `published-online`, `issued`, `created` and friends
    #[serde(flatten)]
    dates: std::collections::HashMap<String, Value>,
}

/// Render a `{"date-parts": [[y, m, d]]}` object from its first entry
fn render_date_parts(value: &Value) -> String {
    let Some(parts) = value
        .get("date-parts")
        .and_then(Value::as_array)
        .and_then(|all| all.first())
        .and_then(Value::as_array)
    else {
        return String::new();
    };

    let part = |idx: usize| parts.get(idx).and_then(date_part);
    assemble_date(part(0), part(1), part(2))
}

fn date_part(value: &Value) -> Option<DatePart> {
    match value {
        Value::Number(n) => n.as_i64().map(DatePart::Number),
        Value::String(s) => Some(DatePart::Text(s.clone())),
        _ => None,
    }
}
