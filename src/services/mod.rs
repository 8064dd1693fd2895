pub mod color_store;
pub mod export;
pub mod format;
pub mod import;
pub mod operation;

pub use color_store::BulkColorStore;
pub use export::{write_csv, write_json, ExportCursor};
pub use format::FileFormat;
pub use import::{CsvRows, JsonRows};
pub use operation::{Busy, CancelFlag, OperationGuard, OperationKind, OperationLock};
