use thiserror::Error;

/// A bad field value. Recovered per row during bulk import, surfaced to the
/// caller for single-record operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{channel} value {value:?} is not an integer")]
    NotAnInteger { channel: &'static str, value: String },

    #[error("{channel} value {value} is outside 0..=255")]
    OutOfRange { channel: &'static str, value: i64 },

    #[error("color name is empty")]
    EmptyName,

    #[error("expected at least 4 fields, found {found}")]
    TooFewFields { found: usize },

    #[error("missing key `{key}`")]
    MissingKey { key: &'static str },

    #[error("entry is not an object")]
    NotAnObject,

    #[error("batch size must be at least 1")]
    BatchSize,
}

/// The backing database is unusable, or holds nothing to export.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("the color table is empty")]
    EmptyStore,
}

/// The input file cannot be interpreted at all.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("JSON input must be an array of color objects")]
    NotAnArray,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unreadable CSV record at row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("no data rows to import")]
    NoData,
}

#[derive(Debug, Error)]
pub enum ColorStoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for ColorStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(value))
    }
}

impl From<r2d2::Error> for ColorStoreError {
    fn from(value: r2d2::Error) -> Self {
        Self::Storage(StorageError::Pool(value))
    }
}

impl From<std::io::Error> for ColorStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(StorageError::Io(value))
    }
}

impl From<serde_json::Error> for ColorStoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(FormatError::Json(value))
    }
}

impl ColorStoreError {
    pub fn is_empty_store(&self) -> bool {
        matches!(self, Self::Storage(StorageError::EmptyStore))
    }
}

pub type Result<T, E = ColorStoreError> = std::result::Result<T, E>;
