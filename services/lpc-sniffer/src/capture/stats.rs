//! Capture statistics (atomic for thread-safe access)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters updated by the capture thread and read by anyone holding the `Arc`
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub reads: AtomicU64,
    pub bytes_read: AtomicU64,
    pub chunks_queued: AtomicU64,
    pub chunks_dropped: AtomicU64,
    pub read_errors: AtomicU64,
    /// TPM bytes recovered by the extractor
    pub clean_bytes: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_queued(&self) {
        self.chunks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clean(&self, bytes: usize) {
        self.clean_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn get_reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn get_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn get_queued(&self) -> u64 {
        self.chunks_queued.load(Ordering::Relaxed)
    }

    pub fn get_dropped(&self) -> u64 {
        self.chunks_dropped.load(Ordering::Relaxed)
    }

    pub fn get_read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    pub fn get_clean_bytes(&self) -> u64 {
        self.clean_bytes.load(Ordering::Relaxed)
    }
}
