//! Runreport-Store: SQLite Backend for run-report rows
//!
//! This crate provides the relational persistence layer for the run-report
//! analyzer. It owns the SQL statement model and the executors that run it.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: one connection per run, one statement per record, no batching.
//!
//! ## Key Components
//!
//! - `Statement`: DROP / CREATE / INSERT statements and their canonical text
//! - `StatementExecutor`: executes statements against a backend
//! - `SqliteHandle`: rusqlite-backed executor
//! - `DryRunExecutor`: logs statements without touching a database

mod error;
mod executor;
pub mod fakes;
mod handle;
mod schema;

pub use error::StoreError;
pub use executor::{DryRunExecutor, StatementExecutor};
pub use handle::SqliteHandle;
pub use schema::{
    column_name, column_size, quote_value, ColumnDef, Statement, DEFAULT_COLUMN_SIZE,
    DEFAULT_TABLE, REPORT_COLUMNS,
};

/// Result type for runreport-store operations
pub type Result<T> = std::result::Result<T, StoreError>;
