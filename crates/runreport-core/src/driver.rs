//! The processing loop.
//!
//! One file is open at a time and reports are handed to the sink as soon as
//! their closing tag has been parsed. Unreadable files and bad reports are
//! logged and skipped; only a write failure on the primary output or a sink
//! setup failure stops the run.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::decoder::field;
use crate::error::{ReportError, Result};
use crate::filter::RecordFilter;
use crate::metrics::METRICS;
use crate::obs::{self, FileSpan};
use crate::reader::ReportReader;
use crate::report::Element;
use crate::sink::Sink;

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_read: usize,
    pub files_ignored: usize,
    pub records_read: u64,
    pub records_filtered: u64,
    /// Reports handed to the sink, including those it then skipped.
    pub records_processed: u64,
    pub records_skipped: u64,
    /// The record limit was reached before the inputs were exhausted.
    pub stopped_early: bool,
}

struct Driver<'a> {
    config: &'a RunConfig,
    filter: RecordFilter,
    stats: RunStats,
}

enum Flow {
    Continue,
    Stop,
}

impl Driver<'_> {
    /// A limit of zero means no limit.
    fn limit_reached(&self) -> bool {
        self.config
            .max_records
            .filter(|&max| max > 0)
            .is_some_and(|max| self.stats.records_processed >= max)
    }

    fn ignore_file(&mut self, path: &Path, error: &ReportError) {
        self.stats.files_ignored += 1;
        METRICS.inc_files_ignored();
        obs::emit_file_ignored(path, error);
    }

    /// The flag is `true` when the whole file was read without error.
    fn read_file(
        &mut self,
        path: &Path,
        sink: &mut dyn Sink,
        out: &mut dyn Write,
    ) -> Result<(bool, Flow)> {
        let _span = FileSpan::enter(path);
        let reader = match ReportReader::open(path) {
            Ok(reader) => reader,
            Err(e) => {
                self.ignore_file(path, &e);
                return Ok((false, Flow::Continue));
            }
        };
        obs::emit_file_opened(path);
        self.stats.files_read += 1;

        for item in reader {
            let report = match item {
                Ok(report) => report,
                Err(e) => {
                    self.ignore_file(path, &e);
                    return Ok((false, Flow::Continue));
                }
            };
            self.handle_report(&report, path, sink, out)?;
            if self.limit_reached() {
                self.stats.stopped_early = true;
                return Ok((false, Flow::Stop));
            }
        }
        Ok((true, Flow::Continue))
    }

    fn handle_report(
        &mut self,
        report: &Element,
        path: &Path,
        sink: &mut dyn Sink,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.stats.records_read += 1;
        METRICS.inc_records_read();
        let id = report.child_text(field::ID).unwrap_or("unknown");

        if let Err(reason) = self.filter.check(report) {
            self.stats.records_filtered += 1;
            METRICS.inc_records_filtered();
            obs::emit_record_filtered(id, &reason);
            return Ok(());
        }
        if let Some(wanted) = &self.config.record_id {
            if report.child_text(field::ID) != Some(wanted.as_str()) {
                return Ok(());
            }
        }

        match sink.process(report, out) {
            Ok(()) => {}
            Err(ReportError::Io(e)) => return Err(ReportError::Io(e)),
            Err(e) => {
                self.stats.records_skipped += 1;
                METRICS.inc_records_skipped();
                obs::emit_record_skipped(id, &e, self.config.verbose);
            }
        }

        self.stats.records_processed += 1;
        METRICS.inc_records_processed();
        if let Some(every) = self.config.progress_interval.filter(|n| *n > 0) {
            if self.stats.records_processed % every == 0 {
                obs::emit_progress(self.stats.records_processed, path);
            }
        }
        Ok(())
    }
}

/// Stream every report in `files` through `sink`, writing to `out`.
pub fn run(
    config: &RunConfig,
    files: &[PathBuf],
    sink: &mut dyn Sink,
    out: &mut dyn Write,
) -> Result<RunStats> {
    let mut driver = Driver {
        config,
        filter: RecordFilter::new(config.filter.clone()),
        stats: RunStats::default(),
    };
    let mut consumed = Vec::new();

    sink.initialize(out)?;
    if sink.consumes_records() {
        for path in files {
            if driver.limit_reached() {
                driver.stats.stopped_early = true;
                break;
            }
            let (complete, flow) = driver.read_file(path, sink, out)?;
            if complete {
                consumed.push(path.clone());
            }
            if let Flow::Stop = flow {
                break;
            }
        }
    }
    sink.finalize(out, &consumed)?;

    let stats = driver.stats;
    obs::emit_run_finished(
        config.mode.name(),
        stats.files_read,
        stats.records_processed,
        stats.records_skipped,
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::sink::CountSink;
    use std::fs;

    fn write_reports(dir: &Path, name: &str, ids: &[&str]) -> PathBuf {
        let body: String = ids
            .iter()
            .map(|id| format!("<GATK-run-report><id>{id}</id></GATK-run-report>"))
            .collect();
        let path = dir.join(name);
        fs::write(&path, format!("<GATK-run-reports>{body}</GATK-run-reports>")).unwrap();
        path
    }

    #[test]
    fn counts_across_files_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_reports(dir.path(), "a.xml", &["1", "2"]);
        let broken = dir.path().join("broken.xml");
        fs::write(&broken, "<GATK-run-report><id>3</id>").unwrap();
        let b = write_reports(dir.path(), "b.xml", &["4"]);

        let config = RunConfig::new(Mode::Count);
        let mut sink = CountSink::new();
        let mut out: Vec<u8> = Vec::new();
        let stats = run(&config, &[a, broken, b], &mut sink, &mut out).unwrap();

        assert_eq!(out, b"3\n");
        assert_eq!(stats.files_read, 3);
        assert_eq!(stats.files_ignored, 1);
        assert_eq!(stats.records_processed, 3);
    }

    #[test]
    fn missing_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_reports(dir.path(), "a.xml", &["1"]);
        let config = RunConfig::new(Mode::Count);
        let mut sink = CountSink::new();
        let mut out: Vec<u8> = Vec::new();
        let stats = run(&config, &[dir.path().join("gone.xml"), a], &mut sink, &mut out).unwrap();
        assert_eq!(stats.files_ignored, 1);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn stops_after_exactly_max_records() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_reports(dir.path(), "a.xml", &["1", "2", "3"]);
        let b = write_reports(dir.path(), "b.xml", &["4", "5"]);

        let mut config = RunConfig::new(Mode::Count);
        config.max_records = Some(4);
        let mut sink = CountSink::new();
        let mut out: Vec<u8> = Vec::new();
        let stats = run(&config, &[a.clone(), b.clone()], &mut sink, &mut out).unwrap();
        assert_eq!(sink.count(), 4);
        assert!(stats.stopped_early);

        config.max_records = Some(0);
        let mut sink = CountSink::new();
        let stats = run(&config, &[a, b], &mut sink, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(sink.count(), 5);
        assert_eq!(stats.files_read, 2);
        assert!(!stats.stopped_early);
    }

    #[test]
    fn record_id_selects_one_report() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_reports(dir.path(), "a.xml", &["1", "2", "3"]);
        let mut config = RunConfig::new(Mode::Count);
        config.record_id = Some("2".to_string());
        let mut sink = CountSink::new();
        let stats = run(&config, &[a], &mut sink, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(sink.count(), 1);
        assert_eq!(stats.records_read, 3);
    }
}
