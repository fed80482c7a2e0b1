pub mod database;
pub mod error;
pub mod export;
pub mod history;
pub mod kv;
pub mod schema;
pub mod telemetry;

pub use database::Database;
pub use error::StoreError;
pub use export::ExportSnapshot;
pub use history::{HistoryConfig, InsightHistoryStore};
pub use kv::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use telemetry::TelemetrySnapshot;
