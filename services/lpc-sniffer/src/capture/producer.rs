//! Capture thread: device reads → bounded chunk queue

use std::io::ErrorKind;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::device::ByteSource;
use super::queue::{chunk_queue, ChunkReceiver, ChunkSender, PushOutcome, RawChunk};
use super::stats::CaptureStats;
use crate::completion::CompletionFlag;

/// Capture loop settings
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Bytes requested per device read
    pub read_size: usize,
    /// Maximum number of chunks waiting for the extractor
    pub queue_capacity: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            read_size: 64,
            queue_capacity: 32,
        }
    }
}

/// Owns the capture thread. The device handle moves into the thread and is
/// never touched by anything else.
pub struct CaptureProducer {
    config: ProducerConfig,
    done: CompletionFlag,
    stats: Arc<CaptureStats>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureProducer {
    pub fn new(config: ProducerConfig, done: CompletionFlag) -> Self {
        Self {
            config,
            done,
            stats: CaptureStats::new(),
            handle: None,
        }
    }

    /// Start reading from `source` and return the consumer end of the chunk queue
    pub fn start(&mut self, source: ByteSource) -> Result<ChunkReceiver> {
        info!(
            "Starting capture: {} byte reads, queue capacity {}",
            self.config.read_size, self.config.queue_capacity
        );

        let (chunk_tx, chunk_rx) = chunk_queue(self.config.queue_capacity);

        let read_size = self.config.read_size.max(1);
        let done = self.done.clone();
        let stats = self.stats.clone();

        let handle = thread::Builder::new()
            .name("lpc-capture".to_string())
            .spawn(move || run_capture(source, read_size, done, stats, chunk_tx))
            .context("Failed to spawn capture thread")?;
        self.handle = Some(handle);

        Ok(chunk_rx)
    }

    /// Wait for the capture thread to observe the completion flag and exit
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked");
            }
        }
    }

    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }
}

/// Main capture loop (runs in dedicated thread)
fn run_capture(
    mut source: ByteSource,
    read_size: usize,
    done: CompletionFlag,
    stats: Arc<CaptureStats>,
    chunk_tx: ChunkSender,
) {
    let mut buffer = vec![0u8; read_size];
    let mut first_data = true;
    let mut last_stats_time = Instant::now();

    while !done.is_set() {
        // Leave the device alone until the extractor makes room
        if chunk_tx.is_full() {
            thread::yield_now();
            continue;
        }

        match source.read(&mut buffer) {
            Ok(0) => thread::yield_now(),
            Ok(n_read) => {
                if first_data {
                    info!("First LPC data received ({} bytes)", n_read);
                    first_data = false;
                }
                stats.record_read(n_read);

                match chunk_tx.push(RawChunk::new(buffer[..n_read].to_vec())) {
                    PushOutcome::Queued => stats.record_queued(),
                    // Never hit while this thread is the only sender; the is_full wait above keeps room
                    PushOutcome::Dropped => {
                        stats.record_dropped();
                        debug!("Chunk queue full, dropping {} bytes", n_read);
                    }
                    PushOutcome::Closed => {
                        warn!("Chunk queue closed, stopping capture");
                        break;
                    }
                }

                if last_stats_time.elapsed() >= Duration::from_secs(5) {
                    info!(
                        "[Capture] Reads: {} | Bytes: {} | Queued: {} | Dropped: {}",
                        stats.get_reads(),
                        stats.get_bytes_read(),
                        stats.get_queued(),
                        stats.get_dropped()
                    );
                    last_stats_time = Instant::now();
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
            Err(e) => {
                stats.record_read_error();
                error!("Error reading from sniffer: {}", e);
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    info!(
        "Capture stopped. Reads={}, Bytes={}, Queued={}, Dropped={}, Read errors={}",
        stats.get_reads(),
        stats.get_bytes_read(),
        stats.get_queued(),
        stats.get_dropped(),
        stats.get_read_errors()
    );
}
