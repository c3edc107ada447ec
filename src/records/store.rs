//! Deduplicating record store shared by crawl workers
//!
//! The store only grows: `add` merges a batch under a single critical
//! section, first occurrence of a composite key wins, and `finalize`
//! freezes the store and hands back the records in first-seen order.

use crate::config::KeyField;
use crate::records::Record;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors raised by the record store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store is frozen; {rejected} records rejected")]
    Frozen { rejected: usize },
}

/// Composite dedup key built from the configured fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(Vec<Option<String>>);

/// Which record fields form the dedup key
#[derive(Debug, Clone)]
pub struct DedupPolicy {
    fields: Vec<KeyField>,
}

impl DedupPolicy {
    pub fn new(fields: Vec<KeyField>) -> Self {
        Self { fields }
    }

    /// Builds the key of a record under this policy
    pub fn key_for(&self, record: &Record) -> RecordKey {
        RecordKey(
            self.fields
                .iter()
                .map(|field| record.field(*field).map(str::to_string))
                .collect(),
        )
    }
}

impl Default for DedupPolicy {
    /// `(archive name, fond number, title)`
    fn default() -> Self {
        Self::new(vec![
            KeyField::ArchiveName,
            KeyField::FondNumber,
            KeyField::Title,
        ])
    }
}

/// Result of merging one batch into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records appended to the store
    pub added: usize,
    /// Records discarded because their key was already present
    pub duplicates: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<Record>,
    seen: HashSet<RecordKey>,
    frozen: bool,
}

/// Ordered, deduplicated record collection
#[derive(Debug, Default)]
pub struct RecordStore {
    policy: DedupPolicy,
    inner: Mutex<StoreInner>,
}

impl RecordStore {
    /// Creates an empty store using the given dedup policy
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A panicking worker cannot leave the store half-merged: every
        // mutation below is a single push/insert pair.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merges a batch of records
    ///
    /// Re-adding a record whose key is already present never changes the
    /// store. Fails once the store is frozen.
    pub fn add<I>(&self, records: I) -> Result<MergeOutcome, StoreError>
    where
        I: IntoIterator<Item = Record>,
    {
        // Keys are computed outside the lock
        let keyed: Vec<(RecordKey, Record)> = records
            .into_iter()
            .map(|record| (self.policy.key_for(&record), record))
            .collect();

        let mut inner = self.lock();
        if inner.frozen {
            return Err(StoreError::Frozen {
                rejected: keyed.len(),
            });
        }

        let mut outcome = MergeOutcome::default();
        for (key, record) in keyed {
            if inner.seen.insert(key) {
                inner.records.push(record);
                outcome.added += 1;
            } else {
                outcome.duplicates += 1;
            }
        }

        Ok(outcome)
    }

    /// Number of distinct records held
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the store and returns its records in first-seen order
    ///
    /// Calling it again returns the same sequence.
    pub fn finalize(&self) -> Vec<Record> {
        let mut inner = self.lock();
        inner.frozen = true;
        inner.records.clone()
    }
}
