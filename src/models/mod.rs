//! Core data model shared by every source adapter.

mod record;

pub use record::{IdentityKey, Record, RecordBuilder, SourceKind, UnknownSource};
