use crate::error::StorageError;
use crate::models::{ColorRecord, Rgb};

type Result<T> = std::result::Result<T, StorageError>;

/// Storage seam for the color table.
///
/// Implementations do no locking of their own; callers serialize mutating
/// operations.
pub trait ColorRepository: Send + Sync {
    /// Creates the table and its index if absent. Returns `true` when the
    /// table had to be created.
    fn ensure_schema(&self) -> Result<bool>;

    fn get(&self, rgb: Rgb) -> Result<Option<ColorRecord>>;

    fn count(&self) -> Result<usize>;

    /// The most recently inserted row, if any
    fn latest(&self) -> Result<Option<ColorRecord>>;

    /// Inserts the batch in one transaction, leaving existing keys untouched.
    /// Returns the number of rows actually written.
    fn insert_if_absent(&self, batch: &[ColorRecord]) -> Result<usize>;

    /// Inserts or overwrites the row sharing the record's key
    fn upsert(&self, record: &ColorRecord) -> Result<()>;

    /// Deletes every row, returning how many were removed
    fn delete_all(&self) -> Result<usize>;

    /// Up to `limit` rows ordered by (r,g,b), strictly after `after`
    fn page_after(&self, after: Option<Rgb>, limit: usize) -> Result<Vec<ColorRecord>>;
}
