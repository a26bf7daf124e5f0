//! Output sinks, one per processing mode.
//!
//! The driver calls [`Sink::initialize`] once, [`Sink::process`] for every
//! report that passed the filters, and [`Sink::finalize`] once at end of
//! stream. A `process` error other than an I/O failure on the primary output
//! is logged and the report skipped.

mod count;
mod digest;
mod sql;
mod table;
mod xml;

use std::io::Write;
use std::path::PathBuf;

use runreport_store::StatementExecutor;

use crate::config::{Mode, RunConfig};
use crate::decoder::RecordDecoder;
use crate::error::Result;
use crate::report::Element;

pub use count::CountSink;
pub use digest::{ExceptionSink, SummarySink};
pub use sql::{report_row, SetupSink, SqlSink};
pub use table::{format_value, split_line, TableSink, MINIMAL_FIELDS};
pub use xml::XmlSink;

pub trait Sink {
    /// Called once before the first report.
    fn initialize(&mut self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    /// Consume one filtered report.
    fn process(&mut self, report: &Element, out: &mut dyn Write) -> Result<()>;

    /// Called once at end of stream. `consumed` lists the input files that
    /// were read to the end without error.
    fn finalize(&mut self, _out: &mut dyn Write, _consumed: &[PathBuf]) -> Result<()> {
        Ok(())
    }

    /// `false` for sinks that do all their work in `initialize`.
    fn consumes_records(&self) -> bool {
        true
    }
}

/// Build the sink for `config.mode`.
///
/// `connect` is only invoked by the SQL modes.
pub fn build_sink<F>(
    config: &RunConfig,
    decoder: RecordDecoder,
    connect: F,
) -> Result<Box<dyn Sink>>
where
    F: FnOnce() -> Result<Box<dyn StatementExecutor>>,
{
    let sink: Box<dyn Sink> = match config.mode {
        Mode::Table => Box::new(TableSink::full(decoder)),
        Mode::MinimalTable => Box::new(TableSink::minimal(decoder)),
        Mode::Count => Box::new(CountSink::new()),
        Mode::Xml => Box::new(XmlSink::new()),
        Mode::Archive => Box::new(XmlSink::archive(config.delete_archived)),
        Mode::Exceptions => Box::new(ExceptionSink::new(
            decoder,
            config.exception_selection,
            config.format,
        )),
        Mode::Summary => Box::new(SummarySink::new(decoder, config.format)),
        Mode::LoadToDb => Box::new(SqlSink::new(decoder, connect()?, &config.table)),
        Mode::SetupDb => Box::new(SetupSink::new(connect()?, &config.table)),
    };
    Ok(sink)
}
