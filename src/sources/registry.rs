//! Registry for looking up source adapters by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::{CrossrefSource, OpenAlexSource, PubMedSource, Source, SourceError};
use crate::config::Config;
use crate::utils::{user_agent, HttpClient};

/// Registry for all available source adapters
///
/// Lookups are case-insensitive: `PubMed`, `pubmed` and `PUBMED` all resolve
/// to the same adapter.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the PubMed, Crossref and OpenAlex adapters,
    /// sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let email = config.http.contact_email.clone();
        let client = Arc::new(HttpClient::with_user_agent(
            &user_agent(email.as_deref()),
            config.http.timeout(),
        )?);
        let max_results = config.search.max_results;

        let mut registry = Self::new();
        registry.register(Arc::new(PubMedSource::new(Arc::clone(&client), max_results)));
        registry.register(Arc::new(
            CrossrefSource::new(Arc::clone(&client), max_results).with_mailto(email.clone()),
        ));
        registry.register(Arc::new(
            OpenAlexSource::new(client, max_results).with_email(email),
        ));

        Ok(registry)
    }

    /// Register a source, replacing any previous source with the same id
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_lowercase(), source);
    }

    /// Get a source by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(&name.trim().to_lowercase())
    }

    /// Check if a source exists
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get all source ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
