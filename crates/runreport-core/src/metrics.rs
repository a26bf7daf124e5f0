//! Global atomic counters for report processing.
//!
//! Counters are incremented silently by the driver. Call
//! [`Metrics::flush`] to emit the current values as a single
//! `tracing::info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    records_read: AtomicU64,
    records_filtered: AtomicU64,
    records_processed: AtomicU64,
    records_skipped: AtomicU64,
    files_ignored: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            records_read: AtomicU64::new(0),
            records_filtered: AtomicU64::new(0),
            records_processed: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            files_ignored: AtomicU64::new(0),
        }
    }

    pub fn inc_records_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_records_filtered(&self) {
        self.records_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_records_processed(&self) {
        self.records_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A report that failed to decode or that the sink rejected.
    pub fn inc_records_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "records_skipped", "counter incremented");
    }

    pub fn inc_files_ignored(&self) {
        self.files_ignored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "files_ignored", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            records_read = self.records_read(),
            records_filtered = self.records_filtered(),
            records_processed = self.records_processed(),
            records_skipped = self.records_skipped(),
            files_ignored = self.files_ignored(),
        );
    }

    pub fn records_read(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    pub fn records_filtered(&self) -> u64 {
        self.records_filtered.load(Ordering::Relaxed)
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed.load(Ordering::Relaxed)
    }

    pub fn records_skipped(&self) -> u64 {
        self.records_skipped.load(Ordering::Relaxed)
    }

    pub fn files_ignored(&self) -> u64 {
        self.files_ignored.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.records_read.store(0, Ordering::Relaxed);
        self.records_filtered.store(0, Ordering::Relaxed);
        self.records_processed.store(0, Ordering::Relaxed);
        self.records_skipped.store(0, Ordering::Relaxed);
        self.files_ignored.store(0, Ordering::Relaxed);
    }
}
