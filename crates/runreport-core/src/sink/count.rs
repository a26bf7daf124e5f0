use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;
use crate::report::Element;

use super::Sink;

/// Counts reports and writes the total at end of stream.
#[derive(Debug, Default)]
pub struct CountSink {
    count: u64,
}

impl CountSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Sink for CountSink {
    fn process(&mut self, _report: &Element, _out: &mut dyn Write) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(&mut self, out: &mut dyn Write, _consumed: &[PathBuf]) -> Result<()> {
        writeln!(out, "{}", self.count)?;
        Ok(())
    }
}
