use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::{ReaderBuilder, StringRecordsIntoIter};
use log::{debug, info, warn};
use serde_json::Value;

use crate::base::repository::ColorRepository;
use crate::data::types::{ImportMode, ImportResult, Progress, RawRow, PROGRESS_INTERVAL};
use crate::error::{ColorStoreError, FormatError, Result, ValidationError};
use crate::models::ColorRecord;
use crate::services::operation::CancelFlag;

/// Streams the records of a delimited-text file.
///
/// The file is read twice: once to count records, so progress has a total,
/// and once lazily while importing.
pub struct CsvRows {
    records: StringRecordsIntoIter<File>,
    remaining: usize,
    row: usize,
}

impl CsvRows {
    pub fn open(path: &Path) -> Result<Self> {
        let total = Self::reader(path)?.into_records().count();
        let records = Self::reader(path)?.into_records();
        debug!("{} holds {} CSV records", path.display(), total);
        Ok(Self {
            records,
            remaining: total,
            row: 0,
        })
    }

    fn reader(path: &Path) -> Result<csv::Reader<File>> {
        let file = File::open(path)?;
        Ok(ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file))
    }
}

impl Iterator for CsvRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        self.row += 1;
        let row = self.row;
        Some(
            record
                .map(|record| RawRow::Fields(record.iter().map(str::to_string).collect()))
                .map_err(|source| FormatError::Csv { row, source }.into()),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for CsvRows {}

/// Elements of a JSON array file
pub struct JsonRows {
    items: std::vec::IntoIter<Value>,
}

impl JsonRows {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let value: Value = serde_json::from_reader(reader)?;
        Ok(Self::from_value(value)?)
    }

    pub fn from_value(value: Value) -> Result<Self, FormatError> {
        match value {
            Value::Array(items) => Ok(Self {
                items: items.into_iter(),
            }),
            _ => Err(FormatError::NotAnArray),
        }
    }
}

impl Iterator for JsonRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|value| Ok(RawRow::Object(value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for JsonRows {}

/// The batch loop behind every bulk import
pub(crate) struct BatchImporter<'a> {
    repository: &'a dyn ColorRepository,
    batch_size: usize,
    cancel: Option<&'a CancelFlag>,
}

impl<'a> BatchImporter<'a> {
    pub(crate) fn new(
        repository: &'a dyn ColorRepository,
        batch_size: usize,
        cancel: Option<&'a CancelFlag>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ValidationError::BatchSize.into());
        }
        Ok(Self {
            repository,
            batch_size,
            cancel,
        })
    }

    pub(crate) fn run<I, F>(&self, source: I, mode: ImportMode, mut on_progress: F) -> Result<ImportResult>
    where
        I: IntoIterator<Item = Result<RawRow>>,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(Progress),
    {
        let mut rows = source.into_iter().peekable();
        let mut total = rows.len();

        let has_header = matches!(rows.peek(), Some(Ok(row)) if row.is_header());
        if has_header {
            debug!("First row is a header, skipping it");
            rows.next();
            total -= 1;
        }
        if total == 0 {
            return Err(FormatError::NoData.into());
        }

        self.check_cancelled()?;
        if mode == ImportMode::Replace {
            // Commits on its own; a failure further down leaves the table empty.
            let removed = self.repository.delete_all()?;
            info!("Replace mode: removed {} existing colors", removed);
        }

        info!("Importing {} rows in batches of {}", total, self.batch_size);
        let header_offset = usize::from(has_header);
        let mut batch: Vec<ColorRecord> = Vec::with_capacity(self.batch_size.min(total));
        let mut succeeded = 0;
        let mut done = 0;
        let mut reported = None;

        for row in rows {
            let row = row?;
            done += 1;
            match row.parse() {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        succeeded += self.commit(&mut batch)?;
                    }
                }
                Err(reason) => warn!("Skipping row {}: {}", done + header_offset, reason),
            }

            if done % PROGRESS_INTERVAL == 0 || done == total {
                on_progress(Progress { done, total });
                reported = Some(done);
            }
        }

        if !batch.is_empty() {
            succeeded += self.commit(&mut batch)?;
        }
        if reported != Some(done) {
            on_progress(Progress { done, total });
        }

        let result = ImportResult { succeeded, total };
        info!(
            "Import finished: {} of {} rows accepted, {} skipped",
            result.succeeded,
            result.total,
            result.skipped()
        );
        Ok(result)
    }

    fn commit(&self, batch: &mut Vec<ColorRecord>) -> Result<usize> {
        self.check_cancelled()?;
        self.repository.insert_if_absent(batch)?;
        let committed = batch.len();
        batch.clear();
        Ok(committed)
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.is_cancelled() => {
                // A cancellation stops one import, not every later one.
                flag.reset();
                warn!("Import cancelled");
                Err(ColorStoreError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}
