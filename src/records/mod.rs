//! Record types and the deduplicating record store
//!
//! - `Record`: a validated archival entry (archive, fond, title, ...)
//! - `RecordDraft`: raw fields from one listing item, before validation
//! - `RecordStore`: first-seen-wins merge keyed by a configurable
//!   composite key

mod clean;
mod record;
mod store;

pub use clean::{clean_archive_name, clean_description, clean_text};
pub use record::{compare_fond_numbers, sort_records, InvalidRecord, Record, RecordDraft};
pub use store::{DedupPolicy, MergeOutcome, RecordKey, RecordStore, StoreError};
