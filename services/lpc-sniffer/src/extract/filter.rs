//! Address-window filter with leftover carry between chunks

use std::ops::RangeInclusive;

/// LPC I/O addresses of the TPM
pub const TPM_ADDRESS_RANGE: RangeInclusive<u8> = 0x24..=0x27;

/// Record terminator emitted by the sniffer
pub const LINE_TERMINATOR: u8 = 0x0A;

/// `<address> <data> 00 0A`
const RECORD_LEN: usize = 4;

/// Recovers the TPM byte stream from raw sniffer chunks.
///
/// Bytes that might still belong to an incomplete record are carried over
/// to the next chunk, so the output does not depend on where the driver
/// split the stream.
#[derive(Debug)]
pub struct StreamExtractor {
    address_range: RangeInclusive<u8>,
    leftover: Vec<u8>,
}

impl StreamExtractor {
    pub fn new() -> Self {
        Self::with_address_range(TPM_ADDRESS_RANGE)
    }

    pub fn with_address_range(address_range: RangeInclusive<u8>) -> Self {
        Self {
            address_range,
            leftover: Vec::new(),
        }
    }

    /// Filter one raw chunk, appending recovered data bytes to `clean`.
    /// Returns the number of bytes appended.
    pub fn process_chunk(&mut self, chunk: &[u8], clean: &mut Vec<u8>) -> usize {
        let mut work = std::mem::take(&mut self.leftover);
        work.extend_from_slice(chunk);

        let before = clean.len();
        for record in work.windows(RECORD_LEN) {
            if self.is_data_record(record) {
                clean.push(record[1]);
            }
        }

        // Keep everything after the last terminator, plus the final three bytes
        // (no window starting there has been evaluated yet). Without any
        // terminator the whole buffer is still pending.
        let keep_from = match work.iter().rposition(|&b| b == LINE_TERMINATOR) {
            Some(last) => (last + 1).min(work.len().saturating_sub(RECORD_LEN - 1)),
            None => 0,
        };
        work.drain(..keep_from);
        self.leftover = work;

        clean.len() - before
    }

    /// Bytes waiting for the next chunk
    pub fn leftover(&self) -> &[u8] {
        &self.leftover
    }

    fn is_data_record(&self, record: &[u8]) -> bool {
        self.address_range.contains(&record[0]) && record[2] == 0x00 && record[3] == LINE_TERMINATOR
    }
}

impl Default for StreamExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::encode_records;

    fn extract_all(chunks: &[&[u8]]) -> Vec<u8> {
        let mut extractor = StreamExtractor::new();
        let mut clean = Vec::new();
        for chunk in chunks {
            extractor.process_chunk(chunk, &mut clean);
        }
        clean
    }

    #[test]
    fn test_two_records() {
        let raw = hex::decode("24AB000A25CD000A").unwrap();
        assert_eq!(extract_all(&[&raw]), vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_address_window_is_inclusive() {
        let raw = hex::decode("2301000A2402000A2703000A2804000A").unwrap();
        assert_eq!(extract_all(&[&raw]), vec![0x02, 0x03]);
    }

    #[test]
    fn test_rejects_nonzero_third_byte_and_missing_terminator() {
        let raw = hex::decode("24AB010A24CD000B").unwrap();
        assert!(extract_all(&[&raw]).is_empty());
    }

    #[test]
    fn test_record_split_across_chunks() {
        let raw = hex::decode("24AB000A25CD000A").unwrap();
        let (a, b) = raw.split_at(6);

        let mut extractor = StreamExtractor::new();
        let mut clean = Vec::new();
        assert_eq!(extractor.process_chunk(a, &mut clean), 1);
        // Tail after the last terminator, widened to the last three bytes
        assert_eq!(extractor.leftover(), &[0x0A, 0x25, 0xCD]);
        assert_eq!(extractor.process_chunk(b, &mut clean), 1);
        assert_eq!(clean, vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_no_terminator_keeps_whole_buffer() {
        let mut extractor = StreamExtractor::new();
        let mut clean = Vec::new();
        extractor.process_chunk(&[0x24, 0x11, 0x00, 0x24, 0x12], &mut clean);
        assert_eq!(extractor.leftover(), &[0x24, 0x11, 0x00, 0x24, 0x12]);
        assert!(clean.is_empty());
    }

    #[test]
    fn test_terminator_valued_data_byte_at_boundary() {
        // Data byte equals the terminator and the chunk ends right after it
        let raw = hex::decode("2401000A240A000A").unwrap();
        assert_eq!(extract_all(&[&raw[..6], &raw[6..]]), vec![0x01, 0x0A]);
    }

    #[test]
    fn test_every_two_way_split_matches_unsplit() {
        let mut clean_in: Vec<u8> = (0u8..=40).collect();
        clean_in.extend_from_slice(&[0x0A, 0x00, 0x0A, 0x24, 0x0A]);
        let raw = encode_records(&clean_in);
        let whole = extract_all(&[&raw]);
        assert_eq!(whole, clean_in);

        for split in 0..=raw.len() {
            let (a, b) = raw.split_at(split);
            assert_eq!(extract_all(&[a, b]), whole, "split at {}", split);
        }
    }

    #[test]
    fn test_small_reads_match_unsplit() {
        let clean_in: Vec<u8> = (0u8..=255).collect();
        let raw = encode_records(&clean_in);

        for size in 1..=9 {
            let chunks: Vec<&[u8]> = raw.chunks(size).collect();
            assert_eq!(extract_all(&chunks), clean_in, "read size {}", size);
        }
    }

    #[test]
    fn test_dropped_chunk_leaves_earlier_output_intact() {
        let clean_in: Vec<u8> = (0x30u8..0x50).collect();
        let raw = encode_records(&clean_in);
        let chunks: Vec<&[u8]> = raw.chunks(16).collect();

        let mut extractor = StreamExtractor::new();
        let mut clean = Vec::new();
        for chunk in &chunks[..4] {
            extractor.process_chunk(chunk, &mut clean);
        }
        let before_drop = clean.clone();

        // Chunk 4 lost to a full queue
        for chunk in &chunks[5..] {
            extractor.process_chunk(chunk, &mut clean);
        }

        assert!(clean.starts_with(&before_drop));
        assert!(clean.len() < clean_in.len());
    }
}
