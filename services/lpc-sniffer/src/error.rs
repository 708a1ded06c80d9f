//! Error types for the sniffer

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a capture session
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The FTDI serial interface could not be opened or configured
    #[error("could not open serial interface {path} at {baud_rate} baud: {source}")]
    DeviceOpen {
        path: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    /// The captured key could not be written to disk
    #[error("failed to write VMK file {}: {source}", .path.display())]
    KeyWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
