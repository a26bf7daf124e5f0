//! SQLite Handle - Connection and Statement Execution
//!
//! Holds one open connection for the lifetime of a run. INSERT values are
//! bound as parameters; DDL is executed from its canonical text.

use std::path::Path;

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::executor::StatementExecutor;
use crate::schema::Statement;
use crate::Result;

/// SQLite connection handle for run-report rows
pub struct SqliteHandle {
    conn: Connection,
}

impl SqliteHandle {
    /// Open (or create) a database file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;
        info!("Connected to SQLite database");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Number of rows currently in `table`.
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Value of `column` for the row whose `id` equals `id`.
    pub fn lookup(&self, table: &str, id: &str, column: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {column} FROM {table} WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

impl StatementExecutor for SqliteHandle {
    fn execute(&mut self, statement: &Statement) -> Result<()> {
        debug!(table = statement.table(), statement = %statement, "executing");
        match statement {
            Statement::Insert { table, values } => {
                let placeholders: Vec<String> =
                    (1..=values.len()).map(|i| format!("?{i}")).collect();
                let sql = format!("INSERT INTO {table} VALUES({})", placeholders.join(", "));
                self.conn.execute(&sql, params_from_iter(values.iter()))?;
            }
            Statement::CreateTable { .. } => {
                self.conn
                    .execute_batch(&statement.to_sql())
                    .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;
            }
            Statement::DropTable { .. } => {
                self.conn.execute_batch(&statement.to_sql())?;
            }
        }
        Ok(())
    }
}
