use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::base::repository::ColorRepository;
use crate::config::Config;
use crate::data::types::{ImportMode, ImportResult, Progress, RawRow, StoreStats};
use crate::data::Database;
use crate::error::Result;
use crate::models::{ColorRecord, Rgb};
use crate::services::export::{self, ExportCursor};
use crate::services::format::FileFormat;
use crate::services::import::{BatchImporter, CsvRows, JsonRows};
use crate::services::operation::CancelFlag;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_EXPORT_LABEL: &str = "Color Name";

/// Batched bulk import/export over the color table.
///
/// Operations must not run concurrently against the same store; see
/// [`OperationLock`](crate::services::operation::OperationLock). Progress
/// callbacks run on whatever thread drives the operation.
pub struct BulkColorStore {
    repository: Arc<dyn ColorRepository>,
    batch_size: usize,
    export_label: String,
    cancel: Option<CancelFlag>,
}

impl BulkColorStore {
    pub fn new(repository: Arc<dyn ColorRepository>) -> Self {
        Self {
            repository,
            batch_size: DEFAULT_BATCH_SIZE,
            export_label: DEFAULT_EXPORT_LABEL.to_string(),
            cancel: None,
        }
    }

    pub fn from_config(database: &Database, config: &Config) -> Self {
        Self::new(database.color_repository())
            .with_batch_size(config.batch_size)
            .with_export_label(config.export_label.clone())
    }

    /// Batch size used by the file-level operations
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Name column label written in the CSV export header
    pub fn with_export_label(mut self, label: impl Into<String>) -> Self {
        self.export_label = label.into();
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn ensure_schema(&self) -> Result<()> {
        let created = self.repository.ensure_schema()?;
        if created {
            info!("Color database initialized");
        }
        Ok(())
    }

    /// Imports rows, committing every `batch_size` accepted records.
    ///
    /// Invalid rows are logged and skipped. Batches already committed stay
    /// committed if a later one fails.
    pub fn import_records<I, F>(
        &self,
        source: I,
        mode: ImportMode,
        batch_size: usize,
        on_progress: F,
    ) -> Result<ImportResult>
    where
        I: IntoIterator<Item = Result<RawRow>>,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(Progress),
    {
        BatchImporter::new(self.repository.as_ref(), batch_size, self.cancel.as_ref())?
            .run(source, mode, on_progress)
    }

    /// Opens a cursor over every record in (r,g,b) order
    pub fn export_records<F>(&self, batch_size: usize, on_progress: F) -> Result<ExportCursor<F>>
    where
        F: FnMut(Progress),
    {
        if batch_size == 0 {
            return Err(crate::error::ValidationError::BatchSize.into());
        }
        ExportCursor::new(self.repository.clone(), batch_size, on_progress)
    }

    /// Inserts or overwrites a single record
    pub fn add_one(&self, record: &ColorRecord) -> Result<()> {
        record.validate()?;
        let record = ColorRecord::new(record.r, record.g, record.b, record.name.as_str());
        self.repository.upsert(&record)?;
        info!("Added color: {}", record);
        Ok(())
    }

    pub fn get(&self, rgb: Rgb) -> Result<Option<ColorRecord>> {
        Ok(self.repository.get(rgb)?)
    }

    /// Deletes every record and returns how many were removed
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.repository.delete_all()?;
        info!("Cleared {} colors", removed);
        Ok(removed)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            count: self.repository.count()?,
            latest: self.repository.latest()?,
        })
    }

    /// Imports a `.csv` or `.json` file using the configured batch size
    pub fn import_file<F>(&self, path: &Path, mode: ImportMode, on_progress: F) -> Result<ImportResult>
    where
        F: FnMut(Progress),
    {
        let format = FileFormat::from_path(path)?;
        info!("Importing {:?} file {}", format, path.display());
        match format {
            FileFormat::Csv => {
                self.import_records(CsvRows::open(path)?, mode, self.batch_size, on_progress)
            }
            FileFormat::Json => {
                self.import_records(JsonRows::open(path)?, mode, self.batch_size, on_progress)
            }
        }
    }

    /// Exports every record to a `.csv` or `.json` file, returning the count
    pub fn export_file<F>(&self, path: &Path, on_progress: F) -> Result<usize>
    where
        F: FnMut(Progress),
    {
        let format = FileFormat::from_path(path)?;
        let cursor = self.export_records(self.batch_size, on_progress)?;
        info!("Exporting {} colors to {}", cursor.total(), path.display());

        let file = File::create(path)?;
        let count = match format {
            FileFormat::Csv => export::write_csv(cursor, file, &self.export_label)?,
            FileFormat::Json => export::write_json(cursor, file)?,
        };
        info!("Exported {} colors", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ColorStoreError, FormatError, StorageError, ValidationError};
    use serde_json::json;
    use std::collections::HashSet;
    use std::io::Write;

    fn store() -> BulkColorStore {
        let store = BulkColorStore::new(Database::in_memory().unwrap().color_repository());
        store.ensure_schema().unwrap();
        store
    }

    fn csv_rows(rows: &[&[&str]]) -> Vec<Result<RawRow>> {
        rows.iter().map(|&cells| Ok(RawRow::fields(cells))).collect()
    }

    fn all_records(store: &BulkColorStore) -> Vec<ColorRecord> {
        store
            .export_records(10, |_| {})
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_import_skips_invalid_rows_and_commits_partial_batch() {
        let store = store();
        let rows = csv_rows(&[
            &["255", "0", "0", "Red"],
            &["0", "255", "0", "Green"],
            &["999", "0", "0", "Bad"],
        ]);

        let result = store.import_records(rows, ImportMode::Append, 2, |_| {}).unwrap();

        assert_eq!(result, ImportResult { succeeded: 2, total: 3 });
        assert_eq!(result.skipped(), 1);
        assert_eq!(
            all_records(&store),
            vec![ColorRecord::new(0, 255, 0, "Green"), ColorRecord::new(255, 0, 0, "Red")]
        );
    }

    #[test]
    fn test_header_row_is_excluded_from_total() {
        let store = store();
        let with_header = csv_rows(&[&["R", "G", "B", "Name"], &["1", "2", "3", "A"]]);
        let result = store.import_records(with_header, ImportMode::Append, 10, |_| {}).unwrap();
        assert_eq!(result.total, 1);

        let without_header = csv_rows(&[&["10", "20", "30", "Foo"], &["1", "2", "3", "A"]]);
        let result = store
            .import_records(without_header, ImportMode::Append, 10, |_| {})
            .unwrap();
        assert_eq!(result.total, 2);

        let named_name = csv_rows(&[&["4", "5", "6", "Name"], &["7", "8", "9", "B"]]);
        let result = store.import_records(named_name, ImportMode::Append, 10, |_| {}).unwrap();
        assert_eq!(result, ImportResult { succeeded: 2, total: 2 });
        assert_eq!(store.get(Rgb::new(4, 5, 6)).unwrap().unwrap().name, "Name");
    }

    #[test]
    fn test_boundary_values_are_rejected_per_row() {
        let store = store();
        let rows = csv_rows(&[
            &["256", "0", "0", "TooHigh"],
            &["-1", "0", "0", "Negative"],
            &["x", "0", "0", "NotANumber"],
            &["1", "2", "3"],
            &["1", "2", "3", "  "],
            &["255", "255", "255", "White"],
        ]);

        let result = store.import_records(rows, ImportMode::Append, 100, |_| {}).unwrap();
        assert_eq!(result, ImportResult { succeeded: 1, total: 6 });
        assert_eq!(store.stats().unwrap().count, 1);
    }

    #[test]
    fn test_append_is_idempotent_and_never_overwrites() {
        let store = store();
        store.add_one(&ColorRecord::new(1, 2, 3, "Kept")).unwrap();
        let rows = || csv_rows(&[&["1", "2", "3", "Ignored"], &["4", "5", "6", "New"]]);

        store.import_records(rows(), ImportMode::Append, 1, |_| {}).unwrap();
        let once = store.stats().unwrap().count;
        store.import_records(rows(), ImportMode::Append, 1, |_| {}).unwrap();

        assert_eq!(store.stats().unwrap().count, once);
        assert_eq!(store.get(Rgb::new(1, 2, 3)).unwrap().unwrap().name, "Kept");
    }

    #[test]
    fn test_replace_mode_clears_existing_rows() {
        let store = store();
        store.add_one(&ColorRecord::new(9, 9, 9, "Old")).unwrap();

        let rows = csv_rows(&[&["1", "1", "1", "New"]]);
        store.import_records(rows, ImportMode::Replace, 10, |_| {}).unwrap();

        assert_eq!(all_records(&store), vec![ColorRecord::new(1, 1, 1, "New")]);
    }

    #[test]
    fn test_import_progress_is_monotonic_and_completes() {
        let store = store();
        let rows: Vec<Result<RawRow>> = (0..250)
            .map(|i| {
                let i = i.to_string();
                Ok(RawRow::fields(&[i.as_str(), "0", "0", "n"]))
            })
            .collect();

        let mut seen = Vec::new();
        let result = store
            .import_records(rows, ImportMode::Append, 64, |p| seen.push(p))
            .unwrap();

        assert_eq!(result, ImportResult { succeeded: 250, total: 250 });
        let done: Vec<_> = seen.iter().map(|p| p.done).collect();
        assert_eq!(done, [100, 200, 250]);
        assert!(seen.iter().all(|p| p.total == 250));
    }

    #[test]
    fn test_empty_source_and_bad_batch_size_fail_before_storage() {
        let store = store();
        store.add_one(&ColorRecord::new(1, 1, 1, "Keep")).unwrap();

        let header_only = csv_rows(&[&["r", "g", "b", "name"]]);
        let err = store
            .import_records(header_only, ImportMode::Replace, 10, |_| {})
            .unwrap_err();
        assert!(matches!(err, ColorStoreError::Format(FormatError::NoData)));

        let err = store
            .import_records(csv_rows(&[&["1", "1", "1", "x"]]), ImportMode::Replace, 0, |_| {})
            .unwrap_err();
        assert!(matches!(err, ColorStoreError::Validation(ValidationError::BatchSize)));

        assert_eq!(store.stats().unwrap().count, 1);
    }

    #[test]
    fn test_source_error_aborts_but_keeps_committed_batches() {
        let store = store();
        let rows: Vec<Result<RawRow>> = vec![
            Ok(RawRow::fields(&["1", "1", "1", "a"])),
            Ok(RawRow::fields(&["2", "2", "2", "b"])),
            Err(FormatError::NoData.into()),
            Ok(RawRow::fields(&["3", "3", "3", "c"])),
        ];

        assert!(store.import_records(rows, ImportMode::Append, 1, |_| {}).is_err());
        assert_eq!(store.stats().unwrap().count, 2);
    }

    #[test]
    fn test_cancel_flag_stops_before_first_batch() {
        let flag = CancelFlag::new();
        let store = store().with_cancel_flag(flag.clone());
        store.add_one(&ColorRecord::new(7, 7, 7, "Survivor")).unwrap();
        flag.cancel();

        let rows = csv_rows(&[&["1", "1", "1", "a"]]);
        let err = store.import_records(rows, ImportMode::Replace, 1, |_| {}).unwrap_err();

        assert!(matches!(err, ColorStoreError::Cancelled));
        assert_eq!(all_records(&store), vec![ColorRecord::new(7, 7, 7, "Survivor")]);

        let rows = csv_rows(&[&["1", "1", "1", "a"]]);
        let result = store.import_records(rows, ImportMode::Append, 1, |_| {}).unwrap();
        assert_eq!(result, ImportResult { succeeded: 1, total: 1 });
    }

    #[test]
    fn test_json_rows_with_aliases() {
        let store = store();
        let source = JsonRows::from_value(json!([
            {"red": 1, "green": 2, "blue": 3, "name": "Alias"},
            {"r": "4", "g": "5", "b": "6", "name": "Strings"},
            {"r": 7, "g": 8, "name": "MissingBlue"},
            "not an object"
        ]))
        .unwrap();

        let result = store.import_records(source, ImportMode::Append, 10, |_| {}).unwrap();
        assert_eq!(result, ImportResult { succeeded: 2, total: 4 });
        assert_eq!(store.get(Rgb::new(4, 5, 6)).unwrap().unwrap().name, "Strings");
    }

    #[test]
    fn test_add_one_overwrites_and_validates() {
        let store = store();
        let record = ColorRecord::new(10, 20, 30, "First");
        store.add_one(&record).unwrap();
        assert_eq!(store.get(record.rgb()).unwrap(), Some(record));

        store.add_one(&ColorRecord::new(10, 20, 30, " Second ")).unwrap();
        assert_eq!(
            store.get(Rgb::new(10, 20, 30)).unwrap(),
            Some(ColorRecord::new(10, 20, 30, "Second"))
        );

        let blank = ColorRecord {
            r: 1,
            g: 1,
            b: 1,
            name: "   ".to_string(),
        };
        let err = store.add_one(&blank).unwrap_err();
        assert!(matches!(err, ColorStoreError::Validation(ValidationError::EmptyName)));
        assert_eq!(store.get(Rgb::new(1, 1, 1)).unwrap(), None);

        assert!(ColorRecord::parse("256", "0", "0", "x").is_err());
    }

    #[test]
    fn test_clear_all_then_export_fails() {
        let store = store();
        for i in 0..5u8 {
            store.add_one(&ColorRecord::new(i, i, i, format!("Gray {}", i))).unwrap();
        }

        assert_eq!(store.clear_all().unwrap(), 5);
        assert_eq!(store.stats().unwrap(), StoreStats::default());
        let err = store.export_records(10, |_| {}).err().unwrap();
        assert!(matches!(err, ColorStoreError::Storage(StorageError::EmptyStore)));
    }

    #[test]
    fn test_export_pages_in_key_order_with_progress() {
        let store = store();
        let records: Vec<Result<RawRow>> = (0..=255u8)
            .flat_map(|r| [0u8, 1].map(move |g| (r, g)))
            .map(|(r, g)| {
                Ok(RawRow::fields(&[r.to_string(), g.to_string(), "0".to_string(), format!("c{r}-{g}")]))
            })
            .collect();
        store.import_records(records, ImportMode::Append, 100, |_| {}).unwrap();

        let mut seen = Vec::new();
        let exported: Vec<ColorRecord> = store
            .export_records(64, |p| seen.push(p.done))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(exported.len(), 512);
        assert!(exported.windows(2).all(|w| w[0].rgb() < w[1].rgb()));
        assert_eq!(seen, [100, 200, 300, 400, 500, 512]);
    }

    #[test]
    fn test_file_round_trip_through_replace() {
        let dir = tempfile::tempdir().unwrap();
        let source = store();
        source.add_one(&ColorRecord::new(255, 0, 0, "Red")).unwrap();
        source.add_one(&ColorRecord::new(0, 128, 255, "Azure, light")).unwrap();
        source.add_one(&ColorRecord::new(12, 34, 56, "深蓝")).unwrap();
        let original: HashSet<_> = all_records(&source).into_iter().collect();

        for file_name in ["colors.csv", "colors.json"] {
            let path = dir.path().join(file_name);
            assert_eq!(source.export_file(&path, |_| {}).unwrap(), 3);

            let target = store();
            target.add_one(&ColorRecord::new(1, 1, 1, "Stale")).unwrap();
            let result = target.import_file(&path, ImportMode::Replace, |_| {}).unwrap();

            assert_eq!(result, ImportResult { succeeded: 3, total: 3 });
            let imported: HashSet<_> = all_records(&target).into_iter().collect();
            assert_eq!(imported, original);
        }
    }

    #[test]
    fn test_csv_export_header_uses_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let store = store().with_export_label("颜色名称");
        store.add_one(&ColorRecord::new(1, 2, 3, "x")).unwrap();

        store.export_file(&path, |_| {}).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("R,G,B,颜色名称"));
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.db");
        std::fs::write(&path, vec![0xAB_u8; 4096]).unwrap();

        let database = Database::open(&path, std::time::Duration::from_millis(100)).unwrap();
        let store = BulkColorStore::new(database.color_repository());
        assert!(matches!(
            store.ensure_schema(),
            Err(ColorStoreError::Storage(StorageError::Sqlite(_)))
        ));
    }

    #[test]
    fn test_unsupported_extension_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1,2,3,x").unwrap();

        let store = store();
        let err = store.import_file(&path, ImportMode::Append, |_| {}).unwrap_err();
        assert!(matches!(err, ColorStoreError::Format(FormatError::UnsupportedExtension(_))));
        assert_eq!(store.stats().unwrap().count, 0);
    }
}
