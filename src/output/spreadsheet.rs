//! Spreadsheet export of the final record set
//!
//! The crawl hands over a `RecordTable`: one row per record, a fixed column
//! order, absent optional fields as empty cells. `CsvSink` writes it as a
//! comma- or tab-separated file.

use crate::output::traits::{ExportSink, OutputResult};
use crate::records::Record;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column order of every exported table
pub const COLUMNS: [&str; 6] = [
    "archiveName",
    "fondNumber",
    "title",
    "dateRange",
    "description",
    "sourceUrl",
];

/// The finished dataset as rows of cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    rows: Vec<[String; 6]>,
}

impl RecordTable {
    /// Builds the table, keeping record order
    pub fn from_records(records: &[Record]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                [
                    record.archive_name().to_string(),
                    record.fond_number().unwrap_or_default().to_string(),
                    record.title().to_string(),
                    record.date_range().unwrap_or_default().to_string(),
                    record.description().unwrap_or_default().to_string(),
                    record.source_url().to_string(),
                ]
            })
            .collect();

        Self { rows }
    }

    pub fn header(&self) -> &'static [&'static str; 6] {
        &COLUMNS
    }

    pub fn rows(&self) -> &[[String; 6]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Delimited text format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    Tsv,
}

impl SpreadsheetFormat {
    /// `.tsv` and `.tab` are tab-separated; everything else is CSV
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("tsv") | Some("tab") => SpreadsheetFormat::Tsv,
            _ => SpreadsheetFormat::Csv,
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            SpreadsheetFormat::Csv => b',',
            SpreadsheetFormat::Tsv => b'\t',
        }
    }
}

/// `ExportSink` writing delimited text through the `csv` crate
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file, SpreadsheetFormat::from_path(path)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W, format: SpreadsheetFormat) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter())
            .from_writer(writer);
        Self { writer }
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::output::OutputError::Io(e.into_error()))
    }
}

impl<W: Write> ExportSink for CsvSink<W> {
    fn write_table(&mut self, table: &RecordTable) -> OutputResult<()> {
        self.writer.write_record(table.header())?;
        for row in table.rows() {
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes `records` to `path` as CSV or TSV
pub fn export_records(records: &[Record], path: &Path) -> OutputResult<usize> {
    let table = RecordTable::from_records(records);
    let mut sink = CsvSink::create(path)?;
    sink.write_table(&table)?;
    Ok(table.len())
}
