//! Error types for runreport-store

use thiserror::Error;

/// Errors that can occur in the relational persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Table setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}
