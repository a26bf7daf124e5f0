//! Relational sinks over a [`StatementExecutor`].

use std::io::Write;
use std::path::PathBuf;

use runreport_store::{Statement, StatementExecutor, REPORT_COLUMNS};
use tracing::info;

use crate::decoder::{field, NormalizedRecord, RecordDecoder, MISSING_VALUE};
use crate::error::Result;
use crate::exception::RunStatus;
use crate::report::Element;

use super::Sink;

/// Row values in [`REPORT_COLUMNS`] order. A run status of `NA` is stored as
/// `success`.
pub fn report_row(record: &NormalizedRecord) -> Vec<String> {
    REPORT_COLUMNS
        .iter()
        .map(|&column| {
            let value = record.get(column);
            if column == field::RUN_STATUS && value == MISSING_VALUE {
                RunStatus::Success.as_str().to_string()
            } else {
                value.to_string()
            }
        })
        .collect()
}

/// One INSERT per report. A failed insert fails only that report.
pub struct SqlSink<E> {
    decoder: RecordDecoder,
    executor: E,
    table: String,
    inserted: u64,
}

impl<E: StatementExecutor> SqlSink<E> {
    pub fn new(decoder: RecordDecoder, executor: E, table: &str) -> Self {
        Self {
            decoder,
            executor,
            table: table.to_string(),
            inserted: 0,
        }
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: StatementExecutor> Sink for SqlSink<E> {
    fn process(&mut self, report: &Element, _out: &mut dyn Write) -> Result<()> {
        let record = self.decoder.decode(report)?;
        let statement = Statement::insert(self.table.as_str(), report_row(&record));
        self.executor.execute(&statement)?;
        self.inserted += 1;
        Ok(())
    }

    fn finalize(&mut self, _out: &mut dyn Write, _consumed: &[PathBuf]) -> Result<()> {
        info!(event = "sql.loaded", table = %self.table, rows = self.inserted);
        Ok(())
    }
}

/// Drops and recreates the report table. Reads no reports.
pub struct SetupSink<E> {
    executor: E,
    table: String,
}

impl<E: StatementExecutor> SetupSink<E> {
    pub fn new(executor: E, table: &str) -> Self {
        Self {
            executor,
            table: table.to_string(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: StatementExecutor> Sink for SetupSink<E> {
    fn initialize(&mut self, _out: &mut dyn Write) -> Result<()> {
        self.executor
            .execute(&Statement::drop_table(self.table.as_str()))?;
        self.executor
            .execute(&Statement::create_report_table(self.table.as_str()))?;
        info!(event = "sql.table_created", table = %self.table);
        Ok(())
    }

    fn process(&mut self, _report: &Element, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn consumes_records(&self) -> bool {
        false
    }
}
