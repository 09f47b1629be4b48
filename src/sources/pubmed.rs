//! PubMed research source implementation using E-utilities API.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Record, RecordBuilder, SourceKind};
use crate::sources::{Source, SourceError};
use crate::utils::{assemble_date, month_from_name, DatePart, HttpClient};

/// PubMed E-utilities API base URL
const PUBMED_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed research source
///
/// Uses NCBI E-utilities: `esearch` resolves a keyword to PMIDs, then a
/// single batched `efetch` returns the article XML.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    base_url: String,
    max_results: usize,
}

impl PubMedSource {
    /// Create a new PubMed source
    pub fn new(client: Arc<HttpClient>, max_results: usize) -> Self {
        Self {
            client,
            base_url: PUBMED_EUTILS_BASE.to_string(),
            max_results,
        }
    }

    /// Point the source at a different E-utilities host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build E-utilities search URL
    fn build_search_url(&self, keyword: &str) -> String {
        format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmode=json&sort=pub_date&retmax={}",
            self.base_url,
            urlencoding::encode(keyword),
            self.max_results
        )
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[String]) -> String {
        format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml",
            self.base_url,
            ids.join(",")
        )
    }

    /// Parse E-utilities search response JSON into a PMID list
    fn parse_search_response(json: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            #[serde(default)]
            esearchresult: ESearchResult,
        }

        #[derive(Debug, Default, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
        }

        let result: ESearchResponse = serde_json::from_str(json).map_err(|e| {
            SourceError::Parse(format!("Failed to parse PubMed search JSON: {}", e))
        })?;

        Ok(result.esearchresult.idlist)
    }

    /// Parse an efetch `PubmedArticleSet` document.
    ///
    /// Any XML error fails the whole batch; there is no partial result.
    pub fn parse_fetch_response(xml: &str, keyword: &str) -> Result<Vec<Record>, SourceError> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<String> = Vec::new();
        let mut current: Option<ArticleState> = None;
        let mut records = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    if name == "PubmedArticle" {
                        current = Some(ArticleState::default());
                    } else if let Some(article) = current.as_mut() {
                        article.open(&path, &name, &e)?;
                    }
                    path.push(name);
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    path.pop();
                    if name == "PubmedArticle" {
                        if let Some(article) = current.take() {
                            records.push(article.into_record(keyword));
                        }
                    } else if let Some(article) = current.as_mut() {
                        article.close(&name);
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(article) = current.as_mut() {
                        let text = t.unescape().map_err(|e| {
                            SourceError::Parse(format!("Failed to parse PubMed fetch XML: {}", e))
                        })?;
                        article.text(&path, &text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(article) = current.as_mut() {
                        article.text(&path, &String::from_utf8_lossy(&c));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SourceError::Parse(format!(
                        "Failed to parse PubMed fetch XML at position {}: {}",
                        reader.error_position(),
                        e
                    )));
                }
            }
        }

        if !path.is_empty() {
            return Err(SourceError::Parse(format!(
                "Failed to parse PubMed fetch XML: unexpected end of document inside <{}>",
                path.join("/")
            )));
        }

        Ok(records)
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute_is(e: &BytesStart<'_>, attr: &str, expected: &str) -> Result<bool, SourceError> {
    let value = e
        .try_get_attribute(attr)
        .map_err(|err| SourceError::Parse(format!("Invalid attribute in PubMed XML: {}", err)))?;
    Ok(value
        .and_then(|a| a.unescape_value().ok().map(|v| v.eq_ignore_ascii_case(expected)))
        .unwrap_or(false))
}

fn parent_is(path: &[String], names: &[&str]) -> bool {
    path.len() >= names.len()
        && path[path.len() - names.len()..]
            .iter()
            .zip(names)
            .all(|(have, want)| have == want)
}

#[derive(Debug, Default)]
struct PartialDate {
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
    medline: Option<String>,
}

impl PartialDate {
    fn is_empty(&self) -> bool {
        self.year.is_none() && self.medline.is_none()
    }

    fn set(&mut self, field: &str, text: &str) {
        let slot = match field {
            "Year" => &mut self.year,
            "Month" => &mut self.month,
            "Day" => &mut self.day,
            "MedlineDate" => &mut self.medline,
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn render(&self) -> String {
        if let Some(year) = &self.year {
            return assemble_date(
                Some(DatePart::from(year.as_str())),
                self.month.as_deref().map(DatePart::from),
                self.day.as_deref().map(DatePart::from),
            );
        }

        // MedlineDate carries free text such as "1998 Dec-1999 Jan" or "2000 Spring"
        let Some(medline) = &self.medline else {
            return String::new();
        };
        let mut tokens = medline.split(|c: char| c.is_whitespace() || c == '-');
        let year = tokens.next().map(DatePart::from);
        let month = tokens
            .next()
            .filter(|m| month_from_name(m).is_some())
            .map(DatePart::from);
        assemble_date(year, month, None)
    }
}

#[derive(Debug, Default)]
struct AuthorParts {
    last_name: String,
    fore_name: String,
    initials: String,
    collective_name: String,
}

impl AuthorParts {
    /// Collective name, else "Fore Last", else "Initials Last", else any single part
    fn display_name(&self) -> Option<String> {
        let collective = self.collective_name.trim();
        let last = self.last_name.trim();
        let fore = self.fore_name.trim();
        let initials = self.initials.trim();

        let name = if !collective.is_empty() {
            collective.to_string()
        } else if !fore.is_empty() && !last.is_empty() {
            format!("{} {}", fore, last)
        } else if !initials.is_empty() && !last.is_empty() {
            format!("{} {}", initials, last)
        } else if !last.is_empty() {
            last.to_string()
        } else {
            fore.to_string()
        };

        (!name.is_empty()).then_some(name)
    }
}

/// Accumulates one `PubmedArticle` while its events stream by
#[derive(Debug, Default)]
struct ArticleState {
    title: String,
    abstract_segments: Vec<String>,
    segment: Option<String>,
    authors: Vec<String>,
    author: Option<AuthorParts>,
    doi: Option<String>,
    elocation_doi: Option<String>,
    capture_article_id: Option<String>,
    capture_elocation: Option<String>,
    journal: String,
    pub_date: PartialDate,
    article_date: PartialDate,
    in_first_article_date: bool,
}

impl ArticleState {
    fn open(&mut self, path: &[String], name: &str, e: &BytesStart<'_>) -> Result<(), SourceError> {
        match name {
            "AbstractText" if parent_is(path, &["Abstract"]) => {
                self.segment = Some(String::new());
            }
            "Author" if parent_is(path, &["Article", "AuthorList"]) => {
                self.author = Some(AuthorParts::default());
            }
            "ArticleId" if parent_is(path, &["PubmedData", "ArticleIdList"]) => {
                if attribute_is(e, "IdType", "doi")? {
                    self.capture_article_id = Some(String::new());
                }
            }
            "ELocationID" => {
                if attribute_is(e, "EIdType", "doi")? {
                    self.capture_elocation = Some(String::new());
                }
            }
            "ArticleDate" if parent_is(path, &["Article"]) => {
                self.in_first_article_date = self.article_date.is_empty();
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        match name {
            "AbstractText" => {
                if let Some(segment) = self.segment.take() {
                    let segment = segment.trim();
                    if !segment.is_empty() {
                        self.abstract_segments.push(segment.to_string());
                    }
                }
            }
            "Author" => {
                if let Some(name) = self.author.take().and_then(|a| a.display_name()) {
                    self.authors.push(name);
                }
            }
            "ArticleId" => {
                if let Some(doi) = self.capture_article_id.take() {
                    if self.doi.is_none() && !doi.trim().is_empty() {
                        self.doi = Some(doi);
                    }
                }
            }
            "ELocationID" => {
                if let Some(doi) = self.capture_elocation.take() {
                    if self.elocation_doi.is_none() && !doi.trim().is_empty() {
                        self.elocation_doi = Some(doi);
                    }
                }
            }
            "ArticleDate" => self.in_first_article_date = false,
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        let contains = |name: &str| path.iter().any(|p| p == name);
        let last = path.last().map(String::as_str).unwrap_or("");

        if contains("ArticleTitle") {
            self.title.push_str(text);
        } else if let Some(segment) = self.segment.as_mut() {
            segment.push_str(text);
        } else if let Some(author) = self.author.as_mut() {
            if contains("CollectiveName") {
                author.collective_name.push_str(text);
            } else {
                match last {
                    "LastName" => author.last_name.push_str(text),
                    "ForeName" => author.fore_name.push_str(text),
                    "Initials" => author.initials.push_str(text),
                    _ => {}
                }
            }
        } else if let Some(doi) = self.capture_article_id.as_mut() {
            doi.push_str(text);
        } else if let Some(doi) = self.capture_elocation.as_mut() {
            doi.push_str(text);
        } else if parent_is(path, &["Article", "Journal", "Title"]) {
            self.journal.push_str(text);
        } else if parent_is(path, &["JournalIssue", "PubDate", last]) {
            self.pub_date.set(last, text);
        } else if self.in_first_article_date && parent_is(path, &["ArticleDate", last]) {
            self.article_date.set(last, text);
        }
    }

    fn into_record(self, keyword: &str) -> Record {
        let publication_date = if self.pub_date.is_empty() {
            self.article_date.render()
        } else {
            self.pub_date.render()
        };

        let doi = self.doi.or(self.elocation_doi).unwrap_or_default();

        RecordBuilder::new(SourceKind::PubMed, keyword)
            .title(self.title.replace(['\r', '\n'], " ").trim())
            .authors(self.authors)
            .doi(doi)
            .publication_date(publication_date)
            .journal(self.journal.trim())
            .abstract_text(self.abstract_segments.join("\n"))
            .build()
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::PubMed
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Record>, SourceError> {
        tracing::info!("Querying PubMed for '{}'", keyword);

        let search_json = self
            .client
            .get_text(&self.build_search_url(keyword), self.name())
            .await?;
        let ids = Self::parse_search_response(&search_json)?;

        if ids.is_empty() {
            tracing::info!("No PubMed results for '{}'", keyword);
            return Ok(Vec::new());
        }

        // Fetch details for every PMID in one batch request
        let fetch_xml = self
            .client
            .get_text(&self.build_fetch_url(&ids), self.name())
            .await?;

        let records = Self::parse_fetch_response(&fetch_xml, keyword)?;
        tracing::debug!("PubMed returned {} records for '{}'", records.len(), keyword);
        Ok(records)
    }
}
