use crate::config::KeyField;
use crate::records::clean::{clean_archive_name, clean_description, clean_text};
use crate::url::PageUrl;
use std::cmp::Ordering;
use thiserror::Error;

/// A record rejected because a required field is missing after cleanup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record has no {field}")]
pub struct InvalidRecord {
    pub field: &'static str,
}

/// Raw field text pulled from one listing item, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub archive_name: Option<String>,
    pub fond_number: Option<String>,
    pub title: Option<String>,
    pub date_range: Option<String>,
    pub description: Option<String>,
}

impl RecordDraft {
    /// Cleans every field and validates the record invariants
    ///
    /// `archive_name` and `title` must be non-empty after cleanup; a draft
    /// failing this is rejected rather than emitted.
    pub fn into_record(self, source_url: PageUrl) -> Result<Record, InvalidRecord> {
        let archive_name = self
            .archive_name
            .as_deref()
            .and_then(clean_archive_name)
            .ok_or(InvalidRecord {
                field: "archive name",
            })?;

        let title = self
            .title
            .as_deref()
            .and_then(clean_text)
            .ok_or(InvalidRecord { field: "title" })?;

        Ok(Record {
            archive_name,
            fond_number: self.fond_number.as_deref().and_then(clean_text),
            title,
            date_range: self.date_range.as_deref().and_then(clean_text),
            description: self.description.as_deref().and_then(clean_description),
            source_url,
        })
    }
}

/// One archival entry: a fond held by an archive institution
///
/// Only constructed through `RecordDraft::into_record`, so `archive_name`
/// and `title` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    archive_name: String,
    fond_number: Option<String>,
    title: String,
    date_range: Option<String>,
    description: Option<String>,
    source_url: PageUrl,
}

impl Record {
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn fond_number(&self) -> Option<&str> {
        self.fond_number.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date_range(&self) -> Option<&str> {
        self.date_range.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The page this record was extracted from
    pub fn source_url(&self) -> &PageUrl {
        &self.source_url
    }

    /// Value of a dedup-key field
    pub fn field(&self, field: KeyField) -> Option<&str> {
        match field {
            KeyField::ArchiveName => Some(self.archive_name()),
            KeyField::FondNumber => self.fond_number(),
            KeyField::Title => Some(self.title()),
            KeyField::DateRange => self.date_range(),
            KeyField::Description => self.description(),
        }
    }
}

/// Sorts records by archive name, fond number (natural order), title
///
/// Source URL breaks the remaining ties so the result does not depend on
/// the order workers finished in.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.archive_name
            .cmp(&b.archive_name)
            .then_with(|| compare_fond_numbers(a.fond_number(), b.fond_number()))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.source_url.cmp(&b.source_url))
    });
}

/// Natural ordering of fond numbers: "Р-12" < "Р-101", "12" < "12а" < "13"
///
/// Records without a fond number sort first.
pub fn compare_fond_numbers(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let left = chunks(a);
            let right = chunks(b);
            for (x, y) in left.iter().zip(&right) {
                let ord = x.cmp(y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            left.len().cmp(&right.len()).then_with(|| a.cmp(b))
        }
    }
}

/// A run of digits or of non-digits; digit runs order before text runs
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number { digits: usize, value: String },
    Text(String),
}

fn chunks(s: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for c in s.chars() {
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            out.push(make_chunk(std::mem::take(&mut current), in_digits));
        }
        in_digits = is_digit;
        current.push(c);
    }

    if !current.is_empty() {
        out.push(make_chunk(current, in_digits));
    }

    out
}

fn make_chunk(run: String, digits: bool) -> Chunk {
    if digits {
        // Compare numerically without overflow: length of the significant
        // digits first, then the digits themselves
        let significant = run.trim_start_matches('0');
        let value = if significant.is_empty() { "0" } else { significant };
        Chunk::Number {
            digits: value.len(),
            value: value.to_string(),
        }
    } else {
        Chunk::Text(run.to_lowercase())
    }
}
