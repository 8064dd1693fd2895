pub mod db_inspector;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

pub use db_inspector::DbInspector;

pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds elapsed since `start`, e.g. `1.25s`
pub fn format_elapsed(start: DateTime<Utc>) -> String {
    let millis = (Utc::now() - start).num_milliseconds().max(0);
    format!("{:.2}s", millis as f64 / 1000.0)
}

/// Formats a count with thousands separators, e.g. `16,777,216`
pub fn format_count(count: usize) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Ensures that the directory for the given file path exists
pub fn ensure_directory_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}
