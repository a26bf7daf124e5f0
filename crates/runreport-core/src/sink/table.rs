use std::io::Write;

use crate::decoder::{field, RecordDecoder};
use crate::error::Result;
use crate::report::Element;

use super::Sink;

/// Columns of the minimal table.
pub const MINIMAL_FIELDS: [&str; 4] = [
    field::WALKER_NAME,
    field::START_TIME,
    field::RUN_TIME,
    field::HOST_NAME,
];

/// Render one table cell.
///
/// Backslash, tab and newline are escaped so a record stays on one line;
/// `"` becomes `'`, and values containing a space are double-quoted.
pub fn format_value(value: &str) -> String {
    let mut cell = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => cell.push_str("\\\\"),
            '\t' => cell.push_str("\\t"),
            '\n' => cell.push_str("\\n"),
            '\r' => cell.push_str("\\r"),
            '"' => cell.push('\''),
            other => cell.push(other),
        }
    }
    if cell.contains(' ') {
        format!("\"{cell}\"")
    } else {
        cell
    }
}

fn unescape(cell: &str) -> String {
    let mut value = String::with_capacity(cell.len());
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => value.push('\t'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }
    value
}

/// Split a table line back into cell values, undoing the quoting and
/// escaping added by [`format_value`].
pub fn split_line(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(|cell| {
            let cell = cell
                .strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(cell);
            unescape(cell)
        })
        .collect()
}

/// Tab-separated output: a header of field names, then one line per report.
pub struct TableSink {
    decoder: RecordDecoder,
    columns: Vec<&'static str>,
}

impl TableSink {
    /// Every decoded field.
    pub fn full(decoder: RecordDecoder) -> Self {
        let columns = decoder.fields().to_vec();
        Self { decoder, columns }
    }

    pub fn minimal(decoder: RecordDecoder) -> Self {
        Self {
            decoder,
            columns: MINIMAL_FIELDS.to_vec(),
        }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }
}

impl Sink for TableSink {
    fn initialize(&mut self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}", self.columns.join("\t"))?;
        Ok(())
    }

    fn process(&mut self, report: &Element, out: &mut dyn Write) -> Result<()> {
        let record = self.decoder.decode(report)?;
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|c| format_value(record.get(c)))
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionTable;

    fn report() -> Element {
        Element::new("GATK-run-report")
            .with_child(Element::leaf("id", "r1"))
            .with_child(Element::leaf("walker-name", "CountReads"))
            .with_child(Element::leaf("start-time", "2010/09/10 08.15.00"))
            .with_child(Element::leaf("run-time", "12"))
            .with_child(Element::leaf("host-name", "node7"))
    }

    #[test]
    fn cell_quoting() {
        assert_eq!(format_value("plain"), "plain");
        assert_eq!(format_value("two words"), "\"two words\"");
        assert_eq!(format_value("say \"hi\""), "\"say 'hi'\"");
        assert_eq!(format_value("\"x\""), "'x'");
    }

    #[test]
    fn control_characters_stay_on_one_line() {
        let trace = "at A.run(A.java:1)\nat B.main(B.java:9)";
        let cell = format_value(trace);
        assert!(!cell.contains('\n'));
        assert_eq!(cell, "\"at A.run(A.java:1)\\nat B.main(B.java:9)\"");

        let line = [trace, "tab\there", "back\\slash"]
            .map(format_value)
            .join("\t");
        assert_eq!(
            split_line(&line),
            vec![trace, "tab\there", "back\\slash"]
        );
    }

    #[test]
    fn minimal_table_has_four_columns() {
        let mut sink = TableSink::minimal(RecordDecoder::new(VersionTable::empty()));
        let mut out: Vec<u8> = Vec::new();
        sink.initialize(&mut out).unwrap();
        sink.process(&report(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "walker-name\tstart-time\trun-time\thost-name"
        );
        assert_eq!(
            split_line(lines.next().unwrap()),
            vec!["CountReads", "2010/09/10 08.15.00", "12", "node7"]
        );
    }

    #[test]
    fn full_table_header_matches_decoder_fields() {
        let decoder = RecordDecoder::new(VersionTable::empty());
        let expected = decoder.fields().join("\t");
        let mut sink = TableSink::full(decoder);
        let mut out: Vec<u8> = Vec::new();
        sink.initialize(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{expected}\n"));
    }
}
