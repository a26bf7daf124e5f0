use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::obs;
use crate::report::{Element, RUN_REPORT_LIST};

use super::Sink;

/// Re-emits reports inside a `<GATK-run-reports>` list.
///
/// In archive form the consumed inputs are removed afterwards, but only when
/// deletion was explicitly confirmed; otherwise they are just counted.
#[derive(Debug, Default)]
pub struct XmlSink {
    archive: bool,
    delete_inputs: bool,
    written: u64,
}

impl XmlSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(delete_inputs: bool) -> Self {
        Self {
            archive: true,
            delete_inputs,
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn remove_inputs(&self, consumed: &[PathBuf]) -> usize {
        let mut removed = 0;
        for path in consumed {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    event = "archive.delete_failed",
                    file = %path.display(),
                    error = %e
                ),
            }
        }
        removed
    }
}

impl Sink for XmlSink {
    fn initialize(&mut self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "<{RUN_REPORT_LIST}>")?;
        Ok(())
    }

    fn process(&mut self, report: &Element, out: &mut dyn Write) -> Result<()> {
        report.write_xml(out)?;
        writeln!(out)?;
        self.written += 1;
        Ok(())
    }

    fn finalize(&mut self, out: &mut dyn Write, consumed: &[PathBuf]) -> Result<()> {
        writeln!(out, "</{RUN_REPORT_LIST}>")?;
        if !self.archive {
            return Ok(());
        }
        // Inputs go only once their records are on disk.
        out.flush()?;
        if self.delete_inputs {
            let removed = self.remove_inputs(consumed);
            obs::emit_inputs_deleted(removed, true);
        } else {
            obs::emit_inputs_deleted(consumed.len(), false);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str) -> Element {
        Element::new("GATK-run-report").with_child(Element::leaf("id", id))
    }

    #[test]
    fn wraps_reports_in_list() {
        let mut sink = XmlSink::new();
        let mut out: Vec<u8> = Vec::new();
        sink.initialize(&mut out).unwrap();
        sink.process(&report("a"), &mut out).unwrap();
        sink.process(&report("b & c"), &mut out).unwrap();
        sink.finalize(&mut out, &[]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<GATK-run-reports>\n\
             <GATK-run-report><id>a</id></GATK-run-report>\n\
             <GATK-run-report><id>b &amp; c</id></GATK-run-report>\n\
             </GATK-run-reports>\n"
        );
        assert_eq!(sink.written(), 2);
    }

    #[test]
    fn archive_keeps_inputs_unless_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xml");
        fs::write(&input, "<GATK-run-report/>").unwrap();
        let consumed = vec![input.clone()];

        let mut sink = XmlSink::archive(false);
        sink.finalize(&mut Vec::<u8>::new(), &consumed).unwrap();
        assert!(input.exists());

        let mut sink = XmlSink::archive(true);
        sink.finalize(&mut Vec::<u8>::new(), &consumed).unwrap();
        assert!(!input.exists());
    }
}
