//! HTTP client utilities.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Default per-request deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the identifying `User-Agent` sent to every upstream API
pub fn user_agent(contact_email: Option<&str>) -> String {
    match contact_email {
        Some(email) if !email.trim().is_empty() => format!(
            "{}/{} (mailto:{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            email.trim()
        ),
        _ => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    }
}

/// Shared HTTP client with a fixed user agent and request timeout
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(&user_agent(None), DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom user agent and timeout
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return the body as text. Any non-2xx status is an error.
    pub async fn get_text(&self, url: &str, source_name: &str) -> Result<String, SourceError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            SourceError::Network(format!("Failed to query {}: {}", source_name, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "{} API returned status: {}",
                source_name, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }

    /// GET a URL and deserialize the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        source_name: &str,
    ) -> Result<T, SourceError> {
        let body = self.get_text(url, source_name).await?;
        serde_json::from_str(&body).map_err(|e| {
            SourceError::Parse(format!("Failed to parse {} JSON: {}", source_name, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_with_email() {
        let ua = user_agent(Some("lab@example.org"));
        assert!(ua.starts_with("paper-harvest/"));
        assert!(ua.ends_with("(mailto:lab@example.org)"));
    }

    #[test]
    fn test_user_agent_without_email() {
        assert!(!user_agent(None).contains("mailto"));
        assert!(!user_agent(Some("  ")).contains("mailto"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .get_text(&format!("{}/missing", server.url()), "Test")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Api(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_get_json_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/bad")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let result: Result<serde_json::Value, _> = client
            .get_json(&format!("{}/bad", server.url()), "Test")
            .await;

        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
