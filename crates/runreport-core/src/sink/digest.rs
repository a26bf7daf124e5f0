//! Aggregating sinks: both hold their state until end of stream.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::aggregate::{ExceptionDigest, ExceptionSelection};
use crate::config::ReportFormat;
use crate::decoder::RecordDecoder;
use crate::error::Result;
use crate::report::Element;
use crate::summary::SummaryReport;

use super::Sink;

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Exception digest grouped by stack signature.
///
/// Reports without an `exception` child are ignored.
pub struct ExceptionSink {
    decoder: RecordDecoder,
    digest: ExceptionDigest,
    selection: ExceptionSelection,
    format: ReportFormat,
}

impl ExceptionSink {
    pub fn new(
        decoder: RecordDecoder,
        selection: ExceptionSelection,
        format: ReportFormat,
    ) -> Self {
        Self {
            decoder,
            digest: ExceptionDigest::new(),
            selection,
            format,
        }
    }

    pub fn digest(&self) -> &ExceptionDigest {
        &self.digest
    }
}

impl Sink for ExceptionSink {
    fn process(&mut self, report: &Element, _out: &mut dyn Write) -> Result<()> {
        if report.find("exception").is_none() {
            return Ok(());
        }
        let record = self.decoder.decode(report)?;
        self.digest.add(&record);
        Ok(())
    }

    fn finalize(&mut self, out: &mut dyn Write, _consumed: &[PathBuf]) -> Result<()> {
        for entry in self.digest.finalize(self.selection) {
            match self.format {
                ReportFormat::Text => entry.write_text(out)?,
                ReportFormat::Json => write_json(out, &entry)?,
            }
        }
        Ok(())
    }
}

/// Run totals and distinct users.
pub struct SummarySink {
    decoder: RecordDecoder,
    report: SummaryReport,
    format: ReportFormat,
    generated_at: Option<DateTime<Local>>,
}

impl SummarySink {
    pub fn new(decoder: RecordDecoder, format: ReportFormat) -> Self {
        Self {
            decoder,
            report: SummaryReport::new(),
            format,
            generated_at: None,
        }
    }

    /// Stamp the summary with a fixed time instead of the time of finalization.
    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

impl Sink for SummarySink {
    fn process(&mut self, report: &Element, _out: &mut dyn Write) -> Result<()> {
        let record = self.decoder.decode(report)?;
        self.report.add(&record);
        Ok(())
    }

    fn finalize(&mut self, out: &mut dyn Write, _consumed: &[PathBuf]) -> Result<()> {
        let summary = self
            .report
            .finalize(self.generated_at.unwrap_or_else(Local::now));
        match self.format {
            ReportFormat::Text => summary.write_text(out)?,
            ReportFormat::Json => write_json(out, &summary)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionTable;
    use chrono::TimeZone;

    fn failed_run(id: &str, user: &str, trace: &str, user_error: &str) -> Element {
        let stack = Element::new("stacktrace").with_child(Element::leaf("string", trace));
        Element::new("GATK-run-report")
            .with_child(Element::leaf("id", id))
            .with_child(Element::leaf("user-name", user))
            .with_child(Element::leaf("end-time", "2010/09/10 08.15.00"))
            .with_child(
                Element::new("exception")
                    .with_child(Element::leaf("message", "boom"))
                    .with_child(stack)
                    .with_child(Element::leaf("is-user-exception", user_error)),
            )
    }

    fn clean_run(id: &str, user: &str) -> Element {
        Element::new("GATK-run-report")
            .with_child(Element::leaf("id", id))
            .with_child(Element::leaf("user-name", user))
    }

    fn decoder() -> RecordDecoder {
        RecordDecoder::new(VersionTable::empty())
    }

    #[test]
    fn digest_skips_clean_runs_and_groups_by_trace() {
        let mut sink = ExceptionSink::new(decoder(), ExceptionSelection::All, ReportFormat::Text);
        let mut out: Vec<u8> = Vec::new();
        sink.process(&clean_run("c1", "ann"), &mut out).unwrap();
        sink.process(&failed_run("f1", "ann", "at A.run(A.java:1)", "false"), &mut out)
            .unwrap();
        sink.process(&failed_run("f2", "bob", "at A.run(A.java:1)", "false"), &mut out)
            .unwrap();
        assert_eq!(sink.digest().len(), 1);

        sink.finalize(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("    occurrences        : 2\n"));
        assert!(text.contains("    ids                : f1,f2\n"));
    }

    #[test]
    fn digest_json_lines() {
        let mut sink = ExceptionSink::new(decoder(), ExceptionSelection::User, ReportFormat::Json);
        let mut out: Vec<u8> = Vec::new();
        sink.process(&failed_run("f1", "ann", "at A.run(A.java:1)", "false"), &mut out)
            .unwrap();
        sink.process(&failed_run("u1", "ann", "at B.run(B.java:2)", "true"), &mut out)
            .unwrap();
        sink.finalize(&mut out, &[]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["ids"], "u1");
        assert_eq!(entry["occurrences"], 1);
    }

    #[test]
    fn summary_counts_every_report() {
        let at = Local.with_ymd_and_hms(2010, 9, 10, 8, 0, 0).unwrap();
        let mut sink = SummarySink::new(decoder(), ReportFormat::Json).generated_at(at);
        let mut out: Vec<u8> = Vec::new();
        sink.process(&clean_run("c1", "ann"), &mut out).unwrap();
        sink.process(&failed_run("f1", "bob", "at A.run(A.java:1)", "false"), &mut out)
            .unwrap();
        sink.process(&failed_run("u1", "ann", "at B.run(B.java:2)", "true"), &mut out)
            .unwrap();
        sink.finalize(&mut out, &[]).unwrap();

        let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(summary["runs"], 3);
        assert_eq!(summary["sting_exceptions"], 1);
        assert_eq!(summary["user_exceptions"], 1);
        assert_eq!(summary["users"], serde_json::json!(["ann", "bob"]));
        assert_eq!(summary["generated_at"], "2010-09-10 08:00:00");
    }
}
