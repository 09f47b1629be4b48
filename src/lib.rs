//! # Paper Harvest
//!
//! Collects literature metadata for a set of keywords from PubMed, Crossref
//! and OpenAlex, normalizes it into one record schema, removes duplicates
//! and writes CSV and Markdown reports.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: The normalized [`Record`] and its identity key
//! - [`sources`]: Upstream adapters behind the [`Source`] trait
//! - [`pipeline`]: Concurrent fan-out over (source, keyword) pairs
//! - [`output`]: CSV and Markdown writers
//! - [`utils`]: HTTP client, field normalizers and deduplication
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Record, RecordBuilder, SourceKind};
pub use pipeline::{HarvestReport, Orchestrator, OrchestratorConfig};
pub use sources::{Source, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
