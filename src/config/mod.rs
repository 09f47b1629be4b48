//! Configuration management.
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional TOML file, `PAPER_HARVEST_*` environment variables, and finally
//! command-line flags (applied in `main`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! keywords = "aortic stenosis, deep learning"
//! sources = "pubmed,crossref,openalex"
//! max_results = 20
//!
//! [http]
//! timeout_secs = 30
//! max_concurrent_per_source = 2
//! contact_email = "lab@example.org"
//!
//! [output]
//! directory = "./data"
//! summary_title = "Literature Summary"
//! ```
//!
//! Nested keys map to environment variables with a double underscore, e.g.
//! `PAPER_HARVEST_HTTP__TIMEOUT_SECS=10`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_KEYWORDS: &str =
    "aortic stenosis, mitral regurgitation, valvular heart disease, deep learning";
pub const DEFAULT_SOURCES: &str = "pubmed,crossref,openalex";
pub const CONFIG_FILE_NAME: &str = "paper-harvest.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// What to search for and where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Comma-separated keywords
    #[serde(default = "default_keywords")]
    pub keywords: String,

    /// Comma-separated source names
    #[serde(default = "default_sources")]
    pub sources: String,

    /// Result cap per (source, keyword) request
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            sources: default_sources(),
            max_results: default_max_results(),
        }
    }
}

fn default_keywords() -> String {
    DEFAULT_KEYWORDS.to_string()
}

fn default_sources() -> String {
    DEFAULT_SOURCES.to_string()
}

fn default_max_results() -> usize {
    20
}

/// Upstream request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Deadline for each request and each (source, keyword) unit of work
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum in-flight units per upstream source
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_per_source: usize,

    /// Contact address sent in the user agent and to Crossref/OpenAlex
    #[serde(default = "default_contact_email")]
    pub contact_email: Option<String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_per_source: default_max_concurrent(),
            contact_email: default_contact_email(),
        }
    }
}

/// `PAPER_HARVEST_EMAIL`, when set and non-blank
fn default_contact_email() -> Option<String> {
    std::env::var("PAPER_HARVEST_EMAIL")
        .ok()
        .filter(|email| !email.trim().is_empty())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    2
}

/// Output file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Heading of the Markdown summary
    #[serde(default = "default_summary_title")]
    pub summary_title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            summary_title: default_summary_title(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_summary_title() -> String {
    "Literature Summary".to_string()
}

/// Load configuration from an optional file plus `PAPER_HARVEST_*` variables
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PAPER_HARVEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Split a comma-separated argument into trimmed, non-empty, unique items.
///
/// First occurrence wins, so the declared order is preserved.
pub fn parse_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}
