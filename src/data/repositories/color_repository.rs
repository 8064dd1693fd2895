use std::sync::Arc;

use log::debug;
use rusqlite::{params, OptionalExtension, Row};

use crate::base::repository::ColorRepository;
use crate::data::database::ConnectionPool;
use crate::data::schema::SchemaManager;
use crate::error::StorageError;
use crate::models::{ColorRecord, Rgb};

pub struct SqliteColorRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteColorRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_row(row: &Row) -> rusqlite::Result<ColorRecord> {
        Ok(ColorRecord {
            r: row.get(0)?,
            g: row.get(1)?,
            b: row.get(2)?,
            name: row.get(3)?,
        })
    }
}

impl ColorRepository for SqliteColorRepository {
    fn ensure_schema(&self) -> Result<bool, StorageError> {
        let conn = self.connection_pool.get()?;
        SchemaManager::new(&conn).ensure_schema()
    }

    fn get(&self, rgb: Rgb) -> Result<Option<ColorRecord>, StorageError> {
        let conn = self.connection_pool.get()?;
        let record = conn
            .query_row(
                "SELECT r, g, b, name FROM colors WHERE r = ? AND g = ? AND b = ?",
                params![rgb.r, rgb.g, rgb.b],
                Self::map_row,
            )
            .optional()?;
        Ok(record)
    }

    fn count(&self) -> Result<usize, StorageError> {
        let conn = self.connection_pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM colors", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn latest(&self) -> Result<Option<ColorRecord>, StorageError> {
        let conn = self.connection_pool.get()?;
        let record = conn
            .query_row(
                "SELECT r, g, b, name FROM colors ORDER BY rowid DESC LIMIT 1",
                [],
                Self::map_row,
            )
            .optional()?;
        Ok(record)
    }

    fn insert_if_absent(&self, batch: &[ColorRecord]) -> Result<usize, StorageError> {
        let mut conn = self.connection_pool.get()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO colors (r, g, b, name) VALUES (?, ?, ?, ?)")?;
            for record in batch {
                inserted += stmt.execute(params![record.r, record.g, record.b, record.name])?;
            }
        }
        tx.commit()?;
        debug!(
            "Committed batch of {} records ({} new, {} already present)",
            batch.len(),
            inserted,
            batch.len() - inserted
        );
        Ok(inserted)
    }

    fn upsert(&self, record: &ColorRecord) -> Result<(), StorageError> {
        self.connection_pool.get()?.execute(
            "INSERT OR REPLACE INTO colors (r, g, b, name) VALUES (?, ?, ?, ?)",
            params![record.r, record.g, record.b, record.name],
        )?;
        Ok(())
    }

    fn delete_all(&self) -> Result<usize, StorageError> {
        let removed = self
            .connection_pool
            .get()?
            .execute("DELETE FROM colors", [])?;
        Ok(removed)
    }

    fn page_after(&self, after: Option<Rgb>, limit: usize) -> Result<Vec<ColorRecord>, StorageError> {
        let conn = self.connection_pool.get()?;
        let limit = limit as i64;
        let records = match after {
            Some(key) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT r, g, b, name FROM colors
                     WHERE (r, g, b) > (?, ?, ?)
                     ORDER BY r, g, b
                     LIMIT ?",
                )?;
                let rows = stmt.query_map(params![key.r, key.g, key.b, limit], Self::map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare_cached(
                    "SELECT r, g, b, name FROM colors
                     ORDER BY r, g, b
                     LIMIT ?",
                )?;
                let rows = stmt.query_map([limit], Self::map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }
}
