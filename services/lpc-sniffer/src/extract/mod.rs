//! TPM stream reconstruction and VMK detection
//!
//! The sniffer emits one 4-byte record per LPC transaction:
//! `<address> <data> 00 0A`. Records for the TPM address window
//! (0x24..=0x27) carry the TPM's byte stream in their data byte. The
//! extractor recovers that stream across chunk boundaries and the scanner
//! looks for the VMK marker in it.

mod filter;
pub mod runner;
mod scanner;

pub use runner::ExtractorRunner;

#[cfg(test)]
pub(crate) mod test_support {
    use super::filter::LINE_TERMINATOR;

    /// Encode clean TPM bytes as sniffer records, cycling through the TPM addresses
    /// and interleaving traffic for unrelated addresses.
    pub fn encode_records(clean: &[u8]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(clean.len() * 12);
        for (i, &byte) in clean.iter().enumerate() {
            raw.extend_from_slice(&[0x80, 0x55, 0x00, LINE_TERMINATOR]);
            raw.extend_from_slice(&[0x24 + (i % 4) as u8, byte, 0x00, LINE_TERMINATOR]);
            // TPM address but a non-zero third byte: not a data record
            raw.extend_from_slice(&[0x24, 0x77, 0x01, LINE_TERMINATOR]);
        }
        raw
    }
}
