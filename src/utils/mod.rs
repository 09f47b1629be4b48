//! Utility modules supporting the harvesting pipeline.
//!
//! - [`HttpClient`]: shared HTTP client with a fixed user agent and timeout
//! - [`assemble_date`], [`decode_inverted_index`], [`strip_markup`],
//!   [`normalize_doi`], [`join_authors`]: field normalizers used by the adapters
//! - [`deduplicate_records`]: first-write-wins deduplication by identity key
//! - [`find_duplicates`]: report colliding records without removing them
//!
//! # Deduplication
//!
//! ```rust
//! use paper_harvest::models::{RecordBuilder, SourceKind};
//! use paper_harvest::utils::deduplicate_records;
//!
//! let records = vec![
//!     RecordBuilder::new(SourceKind::PubMed, "aortic stenosis").doi("10.1/x").build(),
//!     RecordBuilder::new(SourceKind::Crossref, "aortic stenosis").doi("10.1/X").build(),
//! ];
//! let unique = deduplicate_records(records);
//! assert_eq!(unique.len(), 1);
//! assert_eq!(unique[0].source(), SourceKind::PubMed);
//! ```

mod dedup;
mod http;
mod normalize;

pub use dedup::{deduplicate_records, find_duplicates};
pub use http::{user_agent, HttpClient, DEFAULT_TIMEOUT};
pub use normalize::{
    assemble_date, decode_inverted_index, join_authors, month_from_name, normalize_doi,
    strip_markup, DatePart, InvertedIndex,
};
