//! Runreport Core Library
//!
//! Streams GATK run-report XML, normalizes each report through a
//! declarative field table, and hands the result to one output sink per
//! processing mode.

pub mod aggregate;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod error;
pub mod exception;
pub mod filter;
pub mod metrics;
pub mod obs;
pub mod output;
pub mod reader;
pub mod report;
pub mod sink;
pub mod summary;
pub mod telemetry;
pub mod version;

pub use aggregate::{
    AggregatedException, DigestEntry, ExceptionDigest, ExceptionSelection, OrderedSet,
};
pub use config::{Mode, ReportFormat, RunConfig};
pub use decoder::{NormalizedRecord, RecordDecoder, MISSING_VALUE};
pub use driver::{run, RunStats};
pub use error::{DecodeError, ReportError, Result, VersionTableError};
pub use exception::{ExceptionInfo, RunStatus};
pub use filter::{FilterConfig, RecordFilter, Rejection};
pub use output::Output;
pub use reader::{resolve_files, ReportReader};
pub use report::Element;
pub use sink::{build_sink, Sink};
pub use summary::{Summary, SummaryReport};
pub use telemetry::init_tracing;
pub use version::{ReleaseType, VersionInfo, VersionTable};

/// Crate version, reported by the binary's `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
