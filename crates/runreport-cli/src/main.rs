//! GATK run-report analyzer
//!
//! The `analyze-run-reports` command reads run-report XML files (plain or
//! gzipped, or directories of them) and emits one representation per mode.
//!
//! ## Modes
//!
//! - `table`, `minimaltable`: tab-separated rows
//! - `count`: number of matching reports
//! - `xml`, `archive`: matching reports re-emitted as one XML list
//! - `exceptions`: exception digest grouped by stack trace
//! - `summary`: run and exception totals
//! - `loadToDB`, `setupDB`: SQLite loading and table setup

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use runreport_core::metrics::METRICS;
use runreport_core::{
    build_sink, resolve_files, ExceptionSelection, FilterConfig, Mode, Output, RecordDecoder,
    ReportFormat, RunConfig, VersionTable,
};
use runreport_store::{DryRunExecutor, SqliteHandle, StatementExecutor, DEFAULT_TABLE};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "analyze-run-reports")]
#[command(author = "Stevedores Org")]
#[command(version = runreport_core::VERSION)]
#[command(about = "Analyze GATK run reports", long_about = None)]
struct Cli {
    /// table, minimaltable, count, xml, archive, exceptions, summary, loadToDB or setupDB
    mode: Mode,

    /// Run-report files or directories (searched recursively)
    files: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Write output here instead of stdout; `.gz` names are gzipped
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Allow archive mode to replace an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Only process the report with this id
    #[arg(short = 'i', long = "id")]
    record_id: Option<String>,

    /// Stop after this many reports
    #[arg(short = 'M', long)]
    max_records: Option<u64>,

    /// Skip reports from developer builds
    #[arg(long)]
    no_dev: bool,

    /// Only keep reports whose version starts with this revision
    #[arg(long = "rev")]
    revision: Option<String>,

    /// Only keep reports that ended at most this many days ago
    #[arg(long)]
    max_days: Option<i64>,

    /// Exceptions to include in the digest: all, user or sting
    #[arg(short = 'E', long = "exception-type", default_value = "all")]
    exception_type: ExceptionSelection,

    /// Digest and summary rendering: text or json
    #[arg(long, default_value = "text")]
    format: ReportFormat,

    /// Log SQL statements instead of executing them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Log progress every N reports
    #[arg(long = "update-freq")]
    update_freq: Option<u64>,

    /// Delete input files after archiving them
    #[arg(short = 'D', long)]
    delete_while_archiving: bool,

    /// Version table used to classify release types
    #[arg(long, env = "RUNREPORT_VERSIONS")]
    versions: Option<PathBuf>,

    /// SQLite database for loadToDB and setupDB
    #[arg(long, env = "RUNREPORT_DB", default_value = "runreports.db")]
    db: PathBuf,

    /// Table for loadToDB and setupDB
    #[arg(long, env = "RUNREPORT_TABLE", default_value = DEFAULT_TABLE)]
    table: String,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let mut filter = FilterConfig::new();
        filter.no_dev = self.no_dev;
        filter.revision = self.revision.clone();
        filter.max_days = self.max_days;

        RunConfig {
            mode: self.mode,
            filter,
            record_id: self.record_id.clone(),
            max_records: self.max_records,
            progress_interval: self.update_freq,
            exception_selection: self.exception_type,
            format: self.format,
            verbose: self.verbose,
            dry_run: self.dry_run,
            delete_archived: self.delete_while_archiving,
            table: self.table.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    runreport_core::init_tracing(cli.json, level);

    let config = cli.run_config();
    let files = input_files(&cli)?;
    let versions = load_versions(cli.versions.as_deref())?;
    let mut out = open_output(&cli)?;

    let mut sink = build_sink(&config, RecordDecoder::new(versions), || {
        connect(&cli.db, config.dry_run)
    })
    .with_context(|| format!("Failed to set up {} output", config.mode))?;

    let stats = runreport_core::run(&config, &files, sink.as_mut(), &mut out)
        .with_context(|| format!("{} run failed", config.mode))?;
    out.finish().context("Failed to flush output")?;

    METRICS.flush();
    info!(
        mode = %config.mode,
        files = files.len(),
        processed = stats.records_processed,
        skipped = stats.records_skipped,
        "done"
    );
    Ok(())
}

fn input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    if cli.mode == Mode::SetupDb {
        return Ok(Vec::new());
    }
    if cli.files.is_empty() {
        bail!("No input files given for mode {}", cli.mode);
    }
    resolve_files(&cli.files).context("Failed to resolve input files")
}

/// A missing version table is not fatal: release types become `unknown`.
fn load_versions(path: Option<&Path>) -> Result<VersionTable> {
    match path {
        None => Ok(VersionTable::empty()),
        Some(path) if !path.exists() => {
            warn!(event = "versions.missing", file = %path.display());
            Ok(VersionTable::empty())
        }
        Some(path) => VersionTable::load(path)
            .with_context(|| format!("Invalid version table {}", path.display())),
    }
}

fn open_output(cli: &Cli) -> Result<Output> {
    match &cli.output {
        None => Ok(Output::stdout()),
        Some(path) => {
            let refuse_existing = cli.mode == Mode::Archive && !cli.overwrite;
            Output::create(path, refuse_existing)
                .with_context(|| format!("Failed to open output {}", path.display()))
        }
    }
}

fn connect(db: &Path, dry_run: bool) -> runreport_core::Result<Box<dyn StatementExecutor>> {
    if dry_run {
        return Ok(Box::new(DryRunExecutor::new()));
    }
    Ok(Box::new(SqliteHandle::open(db)?))
}
