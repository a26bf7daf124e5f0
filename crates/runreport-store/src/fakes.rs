//! In-memory fakes for the statement executor (testing only)
//!
//! `RecordingExecutor` keeps every statement it is given and can be told to
//! reject inserts for particular record ids.

use std::collections::HashSet;

use crate::error::StoreError;
use crate::executor::StatementExecutor;
use crate::schema::Statement;
use crate::Result;

/// Executor that records statements instead of running them.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: Vec<Statement>,
    reject_ids: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any INSERT whose first value (the id column) equals `id`.
    pub fn rejecting(mut self, id: impl Into<String>) -> Self {
        self.reject_ids.insert(id.into());
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn inserts(&self) -> impl Iterator<Item = &Vec<String>> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Insert { values, .. } => Some(values),
            _ => None,
        })
    }
}

impl StatementExecutor for RecordingExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<()> {
        if let Statement::Insert { values, .. } = statement {
            if let Some(id) = values.first() {
                if self.reject_ids.contains(id) {
                    return Err(StoreError::Query(format!("duplicate entry '{id}'")));
                }
            }
        }
        self.statements.push(statement.clone());
        Ok(())
    }
}
