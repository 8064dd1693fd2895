use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use csv::WriterBuilder;
use log::debug;

use crate::base::repository::ColorRepository;
use crate::data::types::{Progress, PROGRESS_INTERVAL};
use crate::error::{Result, StorageError};
use crate::models::{ColorRecord, Rgb};

/// Lazily walks the color table in (r,g,b) order, one page at a time.
pub struct ExportCursor<F> {
    repository: Arc<dyn ColorRepository>,
    batch_size: usize,
    total: usize,
    done: usize,
    reported: Option<usize>,
    last_key: Option<Rgb>,
    page: std::vec::IntoIter<ColorRecord>,
    exhausted: bool,
    on_progress: F,
}

impl<F: FnMut(Progress)> ExportCursor<F> {
    /// Fails with `EmptyStore` when there is nothing to export
    pub(crate) fn new(
        repository: Arc<dyn ColorRepository>,
        batch_size: usize,
        on_progress: F,
    ) -> Result<Self> {
        let total = repository.count()?;
        if total == 0 {
            return Err(StorageError::EmptyStore.into());
        }
        Ok(Self {
            repository,
            batch_size,
            total,
            done: 0,
            reported: None,
            last_key: None,
            page: Vec::new().into_iter(),
            exhausted: false,
            on_progress,
        })
    }

    /// Row count taken when the cursor was opened
    pub fn total(&self) -> usize {
        self.total
    }

    fn advance(&mut self, record: ColorRecord) -> ColorRecord {
        self.last_key = Some(record.rgb());
        self.done += 1;
        if self.done % PROGRESS_INTERVAL == 0 || self.done == self.total {
            self.report();
        }
        record
    }

    fn report(&mut self) {
        (self.on_progress)(Progress {
            done: self.done,
            total: self.total,
        });
        self.reported = Some(self.done);
    }

    fn finish(&mut self) {
        self.exhausted = true;
        if self.reported != Some(self.done) {
            self.report();
        }
    }
}

impl<F: FnMut(Progress)> Iterator for ExportCursor<F> {
    type Item = Result<ColorRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.page.next() {
            return Some(Ok(self.advance(record)));
        }
        if self.exhausted {
            return None;
        }

        match self.repository.page_after(self.last_key, self.batch_size) {
            Ok(page) => {
                debug!("Fetched export page of {} rows", page.len());
                if page.len() < self.batch_size {
                    self.exhausted = true;
                }
                self.page = page.into_iter();
                match self.page.next() {
                    Some(record) => {
                        let record = self.advance(record);
                        if self.exhausted && self.page.len() == 0 {
                            self.finish();
                        }
                        Some(Ok(record))
                    }
                    None => {
                        self.finish();
                        None
                    }
                }
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Writes a `R,G,B,<label>` header followed by one row per record
pub fn write_csv<I, W>(records: I, writer: W, label: &str) -> Result<usize>
where
    I: IntoIterator<Item = Result<ColorRecord>>,
    W: Write,
{
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer
        .write_record(["R", "G", "B", label])
        .map_err(io::Error::from)?;

    let mut count = 0;
    for record in records {
        csv_writer.serialize(record?).map_err(io::Error::from)?;
        count += 1;
    }
    csv_writer.flush()?;
    Ok(count)
}

/// Writes a JSON array of `{r,g,b,name}` objects, one element at a time
pub fn write_json<I, W>(records: I, writer: W) -> Result<usize>
where
    I: IntoIterator<Item = Result<ColorRecord>>,
    W: Write,
{
    let mut out = BufWriter::new(writer);
    out.write_all(b"[\n")?;

    let mut count = 0;
    for record in records {
        let record = record?;
        if count > 0 {
            out.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut out, &record).map_err(io::Error::from)?;
        count += 1;
    }

    out.write_all(b"\n]")?;
    out.flush()?;
    Ok(count)
}
