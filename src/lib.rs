pub mod base;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use base::repository::ColorRepository;

pub use config::Config;

pub use data::{Database, ImportMode, ImportResult, Progress, RawRow, StoreStats};

pub use error::{ColorStoreError, FormatError, StorageError, ValidationError};

pub use models::{ColorRecord, Rgb};

pub use services::{
    color_store::BulkColorStore,
    operation::{CancelFlag, OperationKind, OperationLock},
};
