//! Raw LPC capture from the sniffer's FTDI interface
//!
//! 1. Open the serial interface at the sniffer's baud rate
//! 2. Read fixed-size chunks on a dedicated thread
//! 3. Hand each chunk to the extractor through a bounded queue,
//!    dropping chunks while the queue is full

mod device;
pub mod producer;
pub mod queue;
mod stats;

pub use device::{open_device, DeviceConfig};
pub use producer::{CaptureProducer, ProducerConfig};
pub use queue::{ChunkReceiver, PopOutcome, RawChunk};
pub use stats::CaptureStats;
