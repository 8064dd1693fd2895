use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use crate::data::repositories::SqliteColorRepository;
use crate::error::StorageError;

pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Owns the connection pool and hands out repositories
#[derive(Clone)]
pub struct Database {
    pool: Arc<ConnectionPool>,
}

impl Database {
    /// Opens (creating if needed) the database file at `db_path`
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self, StorageError> {
        info!("Opening color database at {}", db_path.display());
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(move |conn| conn.busy_timeout(busy_timeout));

        let pool = Pool::new(manager)?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// A private in-memory database. Every pooled connection would see its own
    /// empty database, so the pool is capped at one connection.
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn color_repository(&self) -> Arc<SqliteColorRepository> {
        Arc::new(SqliteColorRepository::new(self.pool.clone()))
    }
}
