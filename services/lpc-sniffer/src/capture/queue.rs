//! Bounded FIFO between the capture thread and the extractor
//!
//! Pushing never blocks: a full queue drops the chunk. The sniffer repeats
//! bus traffic often enough that an occasional lost chunk only delays the
//! key, so loss is the backpressure policy rather than an error.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

/// One device read, exactly as returned by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    data: Vec<u8>,
}

impl RawChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Result of a non-blocking push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue at capacity, chunk discarded
    Dropped,
    /// Consumer is gone
    Closed,
}

/// Result of a pop
#[derive(Debug, PartialEq, Eq)]
pub enum PopOutcome {
    Chunk(RawChunk),
    Empty,
    /// Producer is gone and the queue is drained
    Closed,
}

/// Create a queue holding at most `capacity` chunks (minimum 1)
pub fn chunk_queue(capacity: usize) -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (ChunkSender { tx }, ChunkReceiver { rx })
}

/// Producer half of the chunk queue
#[derive(Debug)]
pub struct ChunkSender {
    tx: Sender<RawChunk>,
}

impl ChunkSender {
    pub fn push(&self, chunk: RawChunk) -> PushOutcome {
        match self.tx.try_send(chunk) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => PushOutcome::Dropped,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
        }
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }
}

/// Consumer half of the chunk queue
#[derive(Debug)]
pub struct ChunkReceiver {
    rx: Receiver<RawChunk>,
}

impl ChunkReceiver {
    pub fn pop(&self) -> PopOutcome {
        match self.rx.try_recv() {
            Ok(chunk) => PopOutcome::Chunk(chunk),
            Err(TryRecvError::Empty) => PopOutcome::Empty,
            Err(TryRecvError::Disconnected) => PopOutcome::Closed,
        }
    }

    /// Wait up to `timeout` for a chunk
    pub fn pop_timeout(&self, timeout: Duration) -> PopOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => PopOutcome::Chunk(chunk),
            Err(RecvTimeoutError::Timeout) => PopOutcome::Empty,
            Err(RecvTimeoutError::Disconnected) => PopOutcome::Closed,
        }
    }

    /// Chunks waiting to be popped
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }
}
