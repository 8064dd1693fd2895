use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::services::color_store::{DEFAULT_BATCH_SIZE, DEFAULT_EXPORT_LABEL};

pub const DEFAULT_CONFIG_PATH: &str = "colordb.toml";
pub const MIN_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Settings read from `colordb.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Rows per committed batch and per export page
    pub batch_size: usize,
    /// Name column label in the CSV export header
    pub export_label: String,
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/colors.db"),
            batch_size: DEFAULT_BATCH_SIZE,
            export_label: DEFAULT_EXPORT_LABEL.to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Loads the file at `path`, or the defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        let clamped = self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        if clamped != self.batch_size {
            warn!(
                "batch_size {} is outside {}..={}, using {}",
                self.batch_size, MIN_BATCH_SIZE, MAX_BATCH_SIZE, clamped
            );
            self.batch_size = clamped;
        }
        if self.export_label.trim().is_empty() {
            self.export_label = DEFAULT_EXPORT_LABEL.to_string();
        }
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = Config::from_toml_str("export_label = \"颜色名称\"").unwrap();
        assert_eq!(config.export_label, "颜色名称");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.database_path, PathBuf::from("data/colors.db"));
    }

    #[test]
    fn test_batch_size_is_clamped() {
        assert_eq!(Config::from_toml_str("batch_size = 5").unwrap().batch_size, MIN_BATCH_SIZE);
        assert_eq!(
            Config::from_toml_str("batch_size = 50000").unwrap().batch_size,
            MAX_BATCH_SIZE
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_rejects_bad_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colordb.toml");
        fs::write(&path, "batch_size = \"lots\"").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
