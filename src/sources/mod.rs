//! Source adapters: one per upstream literature API.
//!
//! Every adapter implements the [`Source`] trait and maps its API's response
//! shape onto the shared [`Record`] schema. Upstream quirks (PubMed's two-step
//! search and XML payloads, Crossref's list-valued titles and `date-parts`,
//! OpenAlex's inverted-index abstracts) stay inside the adapter.
//!
//! Adapters are looked up by name through the [`SourceRegistry`]:
//!
//! - `pubmed` - NCBI E-utilities (esearch + efetch)
//! - `crossref` - Crossref REST `/works`
//! - `openalex` - OpenAlex `/works`

mod crossref;
pub mod mock;
mod openalex;
mod pubmed;
mod registry;

pub use crossref::CrossrefSource;
pub use mock::MockSource;
pub use openalex::OpenAlexSource;
pub use pubmed::PubMedSource;
pub use registry::SourceRegistry;

use crate::models::{Record, SourceKind};
use async_trait::async_trait;

/// The Source trait defines the interface for all upstream adapters.
///
/// # Implementing a New Source
///
/// 1. Create a struct holding its [`HttpClient`](crate::utils::HttpClient)
/// 2. Implement `kind` and `search`
/// 3. Register it in [`SourceRegistry::from_config`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Which upstream this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Identifier used on the command line (e.g. "pubmed")
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Query the upstream for one keyword and normalize every hit.
    ///
    /// Transport and parse failures are returned as errors; missing fields
    /// are not errors and map to empty strings. Callers go through
    /// [`Orchestrator`](crate::pipeline::Orchestrator), which logs a failure
    /// and counts it as zero records for that keyword.
    async fn search(&self, keyword: &str) -> Result<Vec<Record>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML or JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Non-success status from the upstream API
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_id_and_name() {
        let source = MockSource::new(SourceKind::OpenAlex);
        assert_eq!(source.id(), "openalex");
        assert_eq!(source.name(), "OpenAlex");
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Api("PubMed API returned status: 500".to_string());
        assert_eq!(err.to_string(), "API error: PubMed API returned status: 500");
    }
}
