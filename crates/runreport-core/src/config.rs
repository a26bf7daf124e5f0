//! Run configuration.
//!
//! Everything a run needs is carried in a [`RunConfig`] value built once by
//! the binary and handed to the driver and sink constructors.

use std::fmt;
use std::str::FromStr;

use runreport_store::DEFAULT_TABLE;

use crate::aggregate::ExceptionSelection;
use crate::filter::FilterConfig;

/// What to do with the matched reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Tab-separated table of every decoded field.
    Table,
    /// Tab-separated table of walker, start time, run time and host.
    MinimalTable,
    /// Number of matched reports.
    Count,
    /// Matched reports re-emitted as an XML list.
    Xml,
    /// Like `Xml`, then optionally deletes the consumed inputs.
    Archive,
    /// Exception digest grouped by stack signature.
    Exceptions,
    /// Run counts and users.
    Summary,
    /// One INSERT per report.
    LoadToDb,
    /// Drop and recreate the report table.
    SetupDb,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::Table,
        Mode::MinimalTable,
        Mode::Count,
        Mode::Xml,
        Mode::Archive,
        Mode::Exceptions,
        Mode::Summary,
        Mode::LoadToDb,
        Mode::SetupDb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Table => "table",
            Mode::MinimalTable => "minimaltable",
            Mode::Count => "count",
            Mode::Xml => "xml",
            Mode::Archive => "archive",
            Mode::Exceptions => "exceptions",
            Mode::Summary => "summary",
            Mode::LoadToDb => "loadToDB",
            Mode::SetupDb => "setupDB",
        }
    }

    /// Modes that talk to the relational backend.
    pub fn uses_database(&self) -> bool {
        matches!(self, Mode::LoadToDb | Mode::SetupDb)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Mode::ALL.iter().map(Mode::name).collect();
                format!("unknown mode '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Rendering of the aggregate reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    /// One JSON document per digest entry / summary.
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown format '{other}', expected text or json")),
        }
    }
}

/// Explicit configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub filter: FilterConfig,
    /// Only process the report with this id.
    pub record_id: Option<String>,
    /// Stop after this many processed reports; zero means no limit.
    pub max_records: Option<u64>,
    /// Log progress every N processed reports.
    pub progress_interval: Option<u64>,
    pub exception_selection: ExceptionSelection,
    pub format: ReportFormat,
    pub verbose: bool,
    /// Log SQL instead of executing it.
    pub dry_run: bool,
    /// Actually delete inputs after archiving.
    pub delete_archived: bool,
    /// Table used by the SQL modes.
    pub table: String,
}

impl RunConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            filter: FilterConfig::new(),
            record_id: None,
            max_records: None,
            progress_interval: None,
            exception_selection: ExceptionSelection::All,
            format: ReportFormat::Text,
            verbose: false,
            dry_run: false,
            delete_archived: false,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.name().parse::<Mode>(), Ok(mode));
        }
    }

    #[test]
    fn mode_names_are_case_sensitive() {
        assert_eq!("loadToDB".parse::<Mode>(), Ok(Mode::LoadToDb));
        let err = "loadtodb".parse::<Mode>().unwrap_err();
        assert!(err.contains("setupDB"));
    }

    #[test]
    fn default_config_targets_report_table() {
        let config = RunConfig::new(Mode::Table);
        assert_eq!(config.table, "GATK_LOGS");
        assert!(config.max_records.is_none());
        assert!(!Mode::Table.uses_database());
        assert!(Mode::SetupDb.uses_database());
    }

    #[test]
    fn report_format_parses() {
        assert_eq!("json".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert!("yaml".parse::<ReportFormat>().is_err());
    }
}
