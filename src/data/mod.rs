pub mod database;
pub mod repositories;
pub mod schema;
pub mod types;

pub use database::{ConnectionPool, Database};
pub use repositories::SqliteColorRepository;
pub use schema::SchemaManager;
pub use types::*;
