//! Structured observability hooks for the report processing loop.
//!
//! This module provides:
//! - File-scoped tracing spans via the `FileSpan` RAII guard
//! - Emission functions for file, record and run lifecycle events
//!
//! Events are emitted at `info!` level unless noted. Verbosity is driven by
//! `RUST_LOG` or the binary's `-v` flag.

use std::error::Error;
use std::fmt::Display;
use std::path::Path;

use tracing::{debug, info, warn};

/// RAII guard that enters a file-scoped span while its reports are read.
///
/// ```ignore
/// let _span = FileSpan::enter(path);
/// // every event below carries file = "<path>"
/// ```
pub struct FileSpan {
    _span: tracing::span::EnteredSpan,
}

impl FileSpan {
    pub fn enter(path: &Path) -> Self {
        let span = tracing::info_span!("runreport.file", file = %path.display());
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: input file opened.
pub fn emit_file_opened(path: &Path) {
    info!(event = "file.opened", file = %path.display());
}

/// Emit event: an input file could not be read or parsed and was skipped.
pub fn emit_file_ignored(path: &Path, error: &dyn Display) {
    warn!(event = "file.ignored", file = %path.display(), error = %error);
}

/// Emit event: a report was dropped by the filters.
pub fn emit_record_filtered(id: &str, reason: &dyn Display) {
    debug!(event = "record.filtered", id = %id, reason = %reason);
}

/// Emit event: a report failed to decode or be consumed and was skipped.
///
/// With `verbose` the full error detail is attached.
pub fn emit_record_skipped(id: &str, error: &dyn Error, verbose: bool) {
    if verbose {
        warn!(event = "record.skipped", id = %id, error = %error, detail = ?error);
    } else {
        warn!(event = "record.skipped", id = %id, error = %error);
    }
}

/// Emit event: progress after every N processed reports.
pub fn emit_progress(processed: u64, file: &Path) {
    info!(event = "run.progress", processed = processed, file = %file.display());
}

/// Emit event: archived inputs removed, or listed for removal.
pub fn emit_inputs_deleted(count: usize, deleted: bool) {
    info!(event = "archive.inputs", count = count, deleted = deleted);
}

/// Emit event: processing loop finished.
pub fn emit_run_finished(mode: &str, files: usize, processed: u64, skipped: u64) {
    info!(
        event = "run.finished",
        mode = %mode,
        files = files,
        processed = processed,
        skipped = skipped,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_span_enters_without_subscriber() {
        let _span = FileSpan::enter(Path::new("reports/a.xml"));
        let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad");
        emit_record_skipped("id-1", &err, true);
    }
}
