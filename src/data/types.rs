use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ColorRecord;

/// How an import treats rows already in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing rows; incoming duplicates are ignored
    #[default]
    Append,
    /// Delete every row first
    Replace,
}

/// One unparsed input row
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// A delimited-text record
    Fields(Vec<String>),
    /// One element of a structured list
    Object(Value),
}

impl RawRow {
    pub fn fields<S: AsRef<str>>(cells: &[S]) -> Self {
        RawRow::Fields(cells.iter().map(|c| c.as_ref().to_string()).collect())
    }

    /// A header row names a column `r`, `red` or `name` and does not carry
    /// integer components, so `255,0,0,Red` stays a data row.
    pub fn is_header(&self) -> bool {
        match self {
            RawRow::Fields(cells) => {
                let names_a_column = cells.iter().any(|cell| {
                    let cell = cell.trim().trim_start_matches('\u{feff}').to_lowercase();
                    matches!(cell.as_str(), "r" | "red" | "name")
                });
                let numeric_components = cells.len() >= 3
                    && cells[..3].iter().all(|cell| cell.trim().parse::<i64>().is_ok());
                names_a_column && !numeric_components
            }
            RawRow::Object(_) => false,
        }
    }

    pub fn parse(&self) -> Result<ColorRecord, crate::error::ValidationError> {
        match self {
            RawRow::Fields(cells) => ColorRecord::from_fields(cells),
            RawRow::Object(value) => ColorRecord::from_json(value),
        }
    }
}

/// Checkpoint passed to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.done as f64 * 100.0 / self.total as f64
        }
    }
}

/// Progress is reported every this many rows, and at completion
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportResult {
    /// Rows that passed validation and were committed
    pub succeeded: usize,
    /// Input rows, header excluded
    pub total: usize,
}

impl ImportResult {
    pub fn skipped(&self) -> usize {
        self.total - self.succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub count: usize,
    /// The most recently inserted row
    pub latest: Option<ColorRecord>,
}
