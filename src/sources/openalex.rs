//! OpenAlex research source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Record, RecordBuilder, SourceKind};
use crate::sources::{Source, SourceError};
use crate::utils::{
    assemble_date, decode_inverted_index, strip_markup, DatePart, HttpClient, InvertedIndex,
};

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex research source
///
/// Uses the OpenAlex REST API `/works` search, newest first.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: Arc<HttpClient>,
    base_url: String,
    max_results: usize,
    email: Option<String>,
}

impl OpenAlexSource {
    /// Create a new OpenAlex source
    pub fn new(client: Arc<HttpClient>, max_results: usize) -> Self {
        Self {
            client,
            base_url: OPENALEX_API_BASE.to_string(),
            max_results,
            email: None,
        }
    }

    /// Add an email to requests (recommended for better rate limits)
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Point the source at a different API host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build request URL
    fn build_search_url(&self, keyword: &str) -> String {
        let url = format!(
            "{}/works?search={}&per-page={}&sort=publication_date:desc",
            self.base_url,
            urlencoding::encode(keyword),
            self.max_results
        );
        self.add_email_if_present(&url)
    }

    /// Add email to request URL if available (for polite pool)
    fn add_email_if_present(&self, url: &str) -> String {
        if let Some(ref email) = self.email {
            format!("{}&mailto={}", url, urlencoding::encode(email))
        } else {
            url.to_string()
        }
    }

    /// Parse a `/works` response body into records
    pub fn parse_response(json: &str, keyword: &str) -> Result<Vec<Record>, SourceError> {
        let data: WorksResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Failed to parse OpenAlex JSON: {}", e)))?;

        Ok(data
            .results
            .into_iter()
            .map(|work| Self::parse_work(work, keyword))
            .collect())
    }

    /// Parse OpenAlex work data
    fn parse_work(work: OAWork, keyword: &str) -> Record {
        let title = work.title.or(work.display_name).unwrap_or_default();

        let authors = work
            .authorships
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.author.and_then(|author| author.display_name))
            .filter(|name| !name.trim().is_empty())
            .collect();

        let doi = work
            .ids
            .and_then(|ids| ids.doi)
            .or(work.doi)
            .unwrap_or_default();

        let publication_date = match work.publication_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => assemble_date(work.publication_year.map(DatePart::Number), None, None),
        };

        let journal = work
            .primary_location
            .and_then(|loc| loc.source)
            .and_then(|source| source.display_name)
            .unwrap_or_default();

        RecordBuilder::new(SourceKind::OpenAlex, keyword)
            .title(strip_markup(&title))
            .authors(authors)
            .doi(doi)
            .publication_date(publication_date)
            .journal(journal.trim())
            .abstract_text(decode_inverted_index(work.abstract_inverted_index.as_ref()))
            .build()
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlex
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Record>, SourceError> {
        tracing::info!("Querying OpenAlex for '{}'", keyword);

        let body = self
            .client
            .get_text(&self.build_search_url(keyword), self.name())
            .await?;

        let records = Self::parse_response(&body, keyword)?;
        tracing::debug!("OpenAlex returned {} records for '{}'", records.len(), keyword);
        Ok(records)
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Debug, Deserialize)]
struct OAWork {
    title: Option<String>,
    display_name: Option<String>,
    doi: Option<String>,
    ids: Option<OAIds>,
    publication_date: Option<String>,
    publication_year: Option<i64>,
    authorships: Option<Vec<OAAuthorship>>,
    primary_location: Option<OALocation>,
    abstract_inverted_index: Option<InvertedIndex>,
}

#[derive(Debug, Deserialize)]
struct OAIds {
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAAuthorship {
    author: Option<OAAuthor>,
}

#[derive(Debug, Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    source: Option<OASource>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const WORKS_JSON: &str = r#"{
        "meta": {"count": 2, "per_page": 20},
        "results": [
            {
                "id": "https://openalex.org/W1",
                "doi": "https://doi.org/10.1/Y",
                "title": "Deep learning for <i>echocardiography</i>",
                "publication_year": 2024,
                "publication_date": "2024-06-30",
                "ids": {"openalex": "https://openalex.org/W1", "doi": "https://doi.org/10.1/Y"},
                "primary_location": {"source": {"display_name": "Radiology: AI"}},
                "authorships": [
                    {"author_position": "first", "author": {"display_name": "Ana Lima"}},
                    {"author_position": "last", "author": {"display_name": "Wei Zhang"}}
                ],
                "abstract_inverted_index": {"learning": [1], "Deep": [0], "works": [2]}
            },
            {
                "id": "https://openalex.org/W2",
                "doi": null,
                "title": null,
                "display_name": "Fallback display name",
                "publication_year": 2019,
                "publication_date": null,
                "primary_location": {"source": null},
                "authorships": [],
                "abstract_inverted_index": null
            }
        ]
    }"#;

    #[test]
    fn test_build_search_url() {
        let source = OpenAlexSource::new(Arc::new(HttpClient::new().unwrap()), 20)
            .with_email(Some("lab@example.org".to_string()));
        let url = source.build_search_url("deep learning");

        assert!(url.starts_with("https://api.openalex.org/works?"));
        assert!(url.contains("search=deep%20learning"));
        assert!(url.contains("per-page=20"));
        assert!(url.contains("sort=publication_date:desc"));
        assert!(url.ends_with("&mailto=lab%40example.org"));
    }

    #[test]
    fn test_parse_response_fields() {
        let records = OpenAlexSource::parse_response(WORKS_JSON, "deep learning").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.source(), SourceKind::OpenAlex);
        assert_eq!(first.title(), "Deep learning for echocardiography");
        assert_eq!(first.authors(), ["Ana Lima", "Wei Zhang"]);
        assert_eq!(first.doi(), "10.1/y");
        assert_eq!(first.publication_date(), "2024-06-30");
        assert_eq!(first.journal(), "Radiology: AI");
        assert_eq!(first.abstract_text(), "Deep learning works");
    }

    #[test]
    fn test_parse_response_nulls_become_empty() {
        let records = OpenAlexSource::parse_response(WORKS_JSON, "deep learning").unwrap();
        let second = &records[1];

        assert_eq!(second.title(), "Fallback display name");
        assert_eq!(second.doi(), "");
        assert_eq!(second.publication_date(), "2019");
        assert_eq!(second.journal(), "");
        assert!(second.authors().is_empty());
        assert_eq!(second.abstract_text(), "");
    }

    #[test]
    fn test_parse_response_top_level_doi_fallback() {
        let json = r#"{"results": [{
            "title": "Only top-level DOI",
            "doi": "https://doi.org/10.5555/Top",
            "ids": {"openalex": "https://openalex.org/W3"},
            "publication_date": "2022-01-15"
        }]}"#;
        let records = OpenAlexSource::parse_response(json, "k").unwrap();

        assert_eq!(records[0].doi(), "10.5555/top");
    }

    #[test]
    fn test_parse_response_abstract_collision_is_stable() {
        let json = r#"{"results": [{
            "title": "Collision",
            "abstract_inverted_index": {"first": [0], "second": [0], "tail": [1]}
        }]}"#;

        for _ in 0..20 {
            let records = OpenAlexSource::parse_response(json, "k").unwrap();
            assert_eq!(records[0].abstract_text(), "second tail");
        }
    }

    #[test]
    fn test_parse_response_invalid_json() {
        assert!(OpenAlexSource::parse_response("{\"results\": 5}", "k").is_err());
    }

    #[tokio::test]
    async fn test_search_against_server() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "deep learning".into()),
                Matcher::UrlEncoded("per-page".into(), "7".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORKS_JSON)
            .create_async()
            .await;

        let source = OpenAlexSource::new(Arc::new(HttpClient::new().unwrap()), 7)
            .with_base_url(server.url());
        let records = source.search("deep learning").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keyword(), "deep learning");
    }
}
