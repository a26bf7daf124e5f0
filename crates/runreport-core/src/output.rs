//! Primary output destination: stdout, a plain file, or a gzip file.

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{ReportError, Result};
use crate::reader::is_gzip;

/// Where the selected sink writes.
pub enum Output {
    Stdout(Stdout),
    File(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Output {
    pub fn stdout() -> Self {
        Output::Stdout(io::stdout())
    }

    /// Open `path` for writing, gzipping when it ends in `.gz`.
    ///
    /// With `refuse_existing`, an existing file is an error rather than
    /// being truncated.
    pub fn create(path: &Path, refuse_existing: bool) -> Result<Self> {
        if refuse_existing && path.exists() {
            return Err(ReportError::OutputExists(path.to_path_buf()));
        }
        let file = BufWriter::new(File::create(path)?);
        if is_gzip(path) {
            Ok(Output::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(Output::File(file))
        }
    }

    /// Flush buffers and write the gzip trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Output::Stdout(mut out) => out.flush(),
            Output::File(mut out) => out.flush(),
            Output::Gzip(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::File(out) => out.write(buf),
            Output::Gzip(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::File(out) => out.flush(),
            Output::Gzip(out) => out.flush(),
        }
    }
}
