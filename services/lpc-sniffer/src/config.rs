//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::{DeviceConfig, ProducerConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Serial device of the sniffer (FTDI channel B)
    pub device_path: String,

    /// Baud rate of the sniffer's UART
    pub baud_rate: u32,

    /// Bytes per device read
    pub read_size: usize,

    /// Device read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Chunks buffered between capture and extraction
    pub queue_capacity: usize,

    /// How long the extractor waits on an empty queue before re-checking for completion
    pub poll_interval_ms: u64,

    /// Where the captured VMK is written
    pub vmk_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            device_path: std::env::var("SNIFFER_DEVICE")
                .unwrap_or_else(|_| "/dev/ttyUSB1".to_string()),

            baud_rate: std::env::var("SNIFFER_BAUD_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2_000_000),

            read_size: std::env::var("SNIFFER_READ_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(64),

            read_timeout_ms: std::env::var("SNIFFER_READ_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),

            queue_capacity: std::env::var("SNIFFER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(32),

            poll_interval_ms: std::env::var("SNIFFER_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),

            vmk_file: std::env::var("VMK_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("vmk.bin")),
        }
    }

    pub fn device(&self) -> DeviceConfig {
        DeviceConfig {
            path: self.device_path.clone(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn producer(&self) -> ProducerConfig {
        ProducerConfig {
            read_size: self.read_size,
            queue_capacity: self.queue_capacity,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
