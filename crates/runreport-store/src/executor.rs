//! Statement execution seam.

use tracing::info;

use crate::schema::Statement;
use crate::Result;

/// Executes SQL statements, one at a time, against some backend.
///
/// Implementations never batch: each call is a complete, independent
/// statement, and a failure affects only that statement.
pub trait StatementExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<()>;
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for Box<E> {
    fn execute(&mut self, statement: &Statement) -> Result<()> {
        (**self).execute(statement)
    }
}

/// Executor that logs each statement and never opens a connection.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    statements_seen: u64,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements_seen(&self) -> u64 {
        self.statements_seen
    }
}

impl StatementExecutor for DryRunExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<()> {
        self.statements_seen += 1;
        info!(event = "sql.dry_run", table = statement.table(), statement = %statement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_counts_statements() {
        let mut exec = DryRunExecutor::new();
        exec.execute(&Statement::drop_table("T")).unwrap();
        exec.execute(&Statement::insert("T", ["a"])).unwrap();
        assert_eq!(exec.statements_seen(), 2);
    }
}
