//! Whole-run summary statistics.

use std::io::{self, Write};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::aggregate::OrderedSet;
use crate::decoder::{field, NormalizedRecord, MISSING_VALUE};

/// A failed run whose engine (not the user) was at fault.
pub fn is_sting_exception(record: &NormalizedRecord) -> bool {
    record.get(field::STACKTRACE) != MISSING_VALUE
        && record.get(field::IS_USER_EXCEPTION) == "false"
}

/// A failed run caused by user input.
pub fn is_user_exception(record: &NormalizedRecord) -> bool {
    record.get(field::STACKTRACE) != MISSING_VALUE
        && record.get(field::IS_USER_EXCEPTION) == "true"
}

/// Running totals over every decoded record.
#[derive(Debug, Default)]
pub struct SummaryReport {
    runs: u64,
    sting_exceptions: u64,
    user_exceptions: u64,
    users: OrderedSet,
}

impl SummaryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &NormalizedRecord) {
        self.runs += 1;
        if is_sting_exception(record) {
            self.sting_exceptions += 1;
        }
        if is_user_exception(record) {
            self.user_exceptions += 1;
        }
        self.users.insert(record.get(field::USER_NAME));
    }

    pub fn finalize(&self, generated_at: DateTime<Local>) -> Summary {
        Summary {
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            runs: self.runs,
            sting_exceptions: self.sting_exceptions,
            user_exceptions: self.user_exceptions,
            users: self.users.iter().map(str::to_string).collect(),
        }
    }
}

/// Finalized summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub generated_at: String,
    pub runs: u64,
    pub sting_exceptions: u64,
    pub user_exceptions: u64,
    /// Distinct users in first-seen order.
    pub users: Vec<String>,
}

impl Summary {
    pub fn write_text<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "GATK run summary for          : {}", self.generated_at)?;
        writeln!(out, "    number of runs            : {}", self.runs)?;
        writeln!(out, "    number of StingExceptions : {}", self.sting_exceptions)?;
        writeln!(out, "    number of UserExceptions  : {}", self.user_exceptions)?;
        writeln!(out, "    users                     : {}", self.users.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(user: &str, stack: &str, flag: &str) -> NormalizedRecord {
        [
            (field::USER_NAME, user),
            (field::STACKTRACE, stack),
            (field::IS_USER_EXCEPTION, flag),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn counts_runs_and_exception_classes() {
        let mut report = SummaryReport::new();
        report.add(&record("alice", "NA", "NA"));
        report.add(&record("bob", "at X", "false"));
        report.add(&record("alice", "at Y", "true"));
        report.add(&record("carol", "NA", "true"));

        let at = Local.with_ymd_and_hms(2010, 9, 10, 8, 0, 0).unwrap();
        let summary = report.finalize(at);
        assert_eq!(summary.runs, 4);
        assert_eq!(summary.sting_exceptions, 1);
        assert_eq!(summary.user_exceptions, 1);
        assert_eq!(summary.users, vec!["alice", "bob", "carol"]);
        assert_eq!(summary.generated_at, "2010-09-10 08:00:00");
    }

    #[test]
    fn text_rendering() {
        let at = Local.with_ymd_and_hms(2010, 9, 10, 8, 0, 0).unwrap();
        let mut report = SummaryReport::new();
        report.add(&record("alice", "NA", "NA"));
        let mut out: Vec<u8> = Vec::new();
        report.finalize(at).write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("    number of runs            : 1\n"));
        assert!(text.ends_with("    users                     : alice\n"));
    }
}
