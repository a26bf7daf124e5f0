//! Table layout and statement model for run-report rows.
//!
//! Statements render to a canonical text form: identifiers use `_` in place
//! of `-`, and INSERT values are wrapped in double quotes after any embedded
//! double quote has been replaced by a single quote.

use std::fmt;

/// Default table name for run-report rows.
pub const DEFAULT_TABLE: &str = "GATK_LOGS";

/// VARCHAR size used for any column without an override.
pub const DEFAULT_COLUMN_SIZE: usize = 128;

/// Columns of the run-report table, in insertion order.
pub const REPORT_COLUMNS: &[&str] = &[
    "id",
    "walker-name",
    "gatk-version",
    "gatk-minor-version",
    "svn-version",
    "start-time",
    "end-time",
    "run-time",
    "user-name",
    "host-name",
    "domain-name",
    "total-memory",
    "stacktrace",
    "exception-at-brief",
    "exception-msg",
    "is-user-exception",
    "run-status",
    "release-type",
];

const SIZE_OVERRIDES: &[(&str, usize)] = &[
    ("domain-name", 256),
    ("exception-at-brief", 1024),
    ("stacktrace", 8192),
    ("exception-msg", 2048),
    ("command-line", 8192),
];

/// SQL column name for a record field (`walker-name` -> `walker_name`).
pub fn column_name(field: &str) -> String {
    field.replace('-', "_")
}

/// VARCHAR size for a record field.
pub fn column_size(field: &str) -> usize {
    SIZE_OVERRIDES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_COLUMN_SIZE)
}

/// Wrap a value in double quotes, replacing embedded double quotes with single quotes.
pub fn quote_value(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "'"))
}

/// A single column of the run-report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub size: usize,
    pub primary_key: bool,
}

impl ColumnDef {
    /// Column definition for a record field, with the size override applied.
    pub fn for_field(field: &str) -> Self {
        Self {
            name: column_name(field),
            size: column_size(field),
            primary_key: field == "id",
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} VARCHAR({})", self.name, self.size)?;
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        Ok(())
    }
}

/// Statements issued by the SQL sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    DropTable {
        table: String,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    /// Values are stored with embedded double quotes already replaced.
    Insert {
        table: String,
        values: Vec<String>,
    },
}

impl Statement {
    pub fn drop_table(table: impl Into<String>) -> Self {
        Statement::DropTable {
            table: table.into(),
        }
    }

    /// CREATE TABLE over [`REPORT_COLUMNS`].
    pub fn create_report_table(table: impl Into<String>) -> Self {
        Statement::CreateTable {
            table: table.into(),
            columns: REPORT_COLUMNS.iter().map(|f| ColumnDef::for_field(f)).collect(),
        }
    }

    pub fn insert<I, S>(table: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Statement::Insert {
            table: table.into(),
            values: values
                .into_iter()
                .map(|v| v.as_ref().replace('"', "'"))
                .collect(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::DropTable { table }
            | Statement::CreateTable { table, .. }
            | Statement::Insert { table, .. } => table,
        }
    }

    /// Canonical SQL text of this statement.
    pub fn to_sql(&self) -> String {
        match self {
            Statement::DropTable { table } => format!("DROP TABLE IF EXISTS {table}"),
            Statement::CreateTable { table, columns } => {
                let cols: Vec<String> = columns.iter().map(ToString::to_string).collect();
                format!("CREATE TABLE {table} ({})", cols.join(", "))
            }
            Statement::Insert { table, values } => {
                let vals: Vec<String> = values.iter().map(|v| quote_value(v)).collect();
                format!("INSERT INTO {table} VALUES({})", vals.join(", "))
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_sizes_use_overrides() {
        assert_eq!(column_size("id"), DEFAULT_COLUMN_SIZE);
        assert_eq!(column_size("stacktrace"), 8192);
        assert_eq!(column_size("exception-msg"), 2048);
        assert_eq!(column_size("domain-name"), 256);
    }

    #[test]
    fn create_table_marks_id_as_primary_key() {
        let sql = Statement::create_report_table("GATK_LOGS").to_sql();
        assert!(sql.starts_with("CREATE TABLE GATK_LOGS (id VARCHAR(128) PRIMARY KEY, "));
        assert!(sql.contains("walker_name VARCHAR(128)"));
        assert!(sql.contains("stacktrace VARCHAR(8192)"));
        assert!(!sql.contains('-'));
    }

    #[test]
    fn insert_quotes_every_value() {
        let stmt = Statement::insert("GATK_LOGS", ["abc", "say \"hi\"", "two words"]);
        assert_eq!(
            stmt.to_sql(),
            "INSERT INTO GATK_LOGS VALUES(\"abc\", \"say 'hi'\", \"two words\")"
        );
    }

    #[test]
    fn statements_name_their_table() {
        assert_eq!(Statement::drop_table("A").table(), "A");
        assert_eq!(Statement::create_report_table("B").table(), "B");
        assert_eq!(Statement::insert("C", ["x"]).table(), "C");
    }

    #[test]
    fn drop_table_is_idempotent_sql() {
        assert_eq!(
            Statement::drop_table("T").to_string(),
            "DROP TABLE IF EXISTS T"
        );
    }
}
