//! Serial interface of the LPC sniffer
//!
//! The iCEstick/iCEBreaker exposes the sniffer on FTDI channel B, which the
//! OS presents as an ordinary serial device (e.g. `/dev/ttyUSB1`).

use std::io::Read;
use std::time::Duration;

use tracing::info;

use crate::error::CaptureError;

/// Anything the producer can pull raw bytes from
pub type ByteSource = Box<dyn Read + Send>;

/// Serial interface settings
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub path: String,
    pub baud_rate: u32,
    /// Upper bound on a single blocking read; a timeout counts as an empty read
    pub read_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB1".to_string(),
            baud_rate: 2_000_000,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Open and configure the sniffer's serial interface (8N1, no flow control)
pub fn open_device(config: &DeviceConfig) -> Result<ByteSource, CaptureError> {
    info!(
        "Opening serial interface {} at {} baud",
        config.path, config.baud_rate
    );

    let port = serialport::new(config.path.as_str(), config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|source| CaptureError::DeviceOpen {
            path: config.path.clone(),
            baud_rate: config.baud_rate,
            source,
        })?;

    Ok(Box::new(port))
}
