//! Persistence layer — libSQL-backed settings storage and the record sink.

pub mod libsql_backend;
pub mod migrations;
pub mod sink;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use sink::{RecordSink, SettingsRecordSink};
pub use traits::Database;
