use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;

pub const COLORS_TABLE: &str = "colors";

/// Creates the color table on first use.
///
/// There are no migrations: an existing table is taken as-is.
pub struct SchemaManager<'a> {
    connection: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Returns `true` if the table was created by this call
    pub fn ensure_schema(&self) -> Result<bool, StorageError> {
        let existed = self.table_exists()?;
        if existed {
            info!("Color table already exists");
        } else {
            info!("Creating color table");
        }

        // Runs every time so a table missing its index gets one.
        self.connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS colors (
                 r SMALLINT NOT NULL CHECK(r >= 0 AND r <= 255),
                 g SMALLINT NOT NULL CHECK(g >= 0 AND g <= 255),
                 b SMALLINT NOT NULL CHECK(b >= 0 AND b <= 255),
                 name TEXT NOT NULL,
                 PRIMARY KEY (r, g, b)
             );
             CREATE INDEX IF NOT EXISTS idx_rgb ON colors(r, g, b);",
        )?;
        debug!("Ensured table '{}' and index 'idx_rgb'", COLORS_TABLE);
        Ok(!existed)
    }

    pub fn table_exists(&self) -> Result<bool, StorageError> {
        let found = self
            .connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
                [COLORS_TABLE],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
