//! Parser for `dislocker-metadata` output
//!
//! Finds the AES-CCM encrypted FVEK datum and pulls out its nonce, MAC and
//! ciphertext. Every relevant line carries an `[INFO] ` tag, optionally
//! preceded by a timestamp. Field positions are fixed relative to the
//! `Datum entry type: 3` line:
//!
//! ```text
//! -1  [INFO] Total datum size: 0x0050 (80) bytes
//!  0  [INFO] Datum entry type: 3
//! +6  [INFO] <nonce hex>
//! +8  [INFO] <MAC hex>
//! +10 [INFO] 0x00000000 <payload hex> ...
//! ```

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Anchor line of the encrypted FVEK datum
pub const FVEK_ENTRY_MARKER: &str = "Datum entry type: 3";

/// size, entry type, value type, status (u16 each)
pub const DATUM_HEADER_LEN: usize = 8;
pub const NONCE_LEN: usize = 12;
pub const MAC_LEN: usize = 16;

/// Line offsets of each field, relative to the anchor line
#[derive(Debug, Clone, Copy)]
struct RecordLayout {
    size: isize,
    nonce: isize,
    mac: isize,
    payload: isize,
}

const FVEK_LAYOUT: RecordLayout = RecordLayout {
    size: -1,
    nonce: 6,
    mac: 8,
    payload: 10,
};

/// Report parse failures. Line numbers are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("no \"Datum entry type: 3\" (FVEK) record found in report")]
    MissingRecord,

    #[error("line {line}: expected {field} line, found end of report")]
    MissingLine { field: &'static str, line: usize },

    #[error("line {line}: malformed {field}: {reason}")]
    Malformed {
        field: &'static str,
        line: usize,
        reason: String,
    },

    #[error("line {line}: {field} must be {expected} bytes, got {actual}")]
    BadLength {
        field: &'static str,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: payload exceeds the declared {expected} bytes (got {actual})")]
    OversizedPayload {
        line: usize,
        expected: usize,
        actual: usize,
    },
}

/// The encrypted FVEK datum as found in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    /// Declared total datum size, header included
    pub size: usize,
    pub nonce: [u8; NONCE_LEN],
    pub mac: [u8; MAC_LEN],
    pub ciphertext: Vec<u8>,
}

fn size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((?P<size>\d+)\) bytes").expect("valid size regex"))
}

fn info_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[INFO\] (?P<data>.*)$").expect("valid info regex"))
}

fn payload_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[INFO\] (?P<offset>0x[0-9a-fA-F]+) (?P<data>.*)$").expect("valid payload regex")
    })
}

/// Parse the encrypted FVEK datum out of a `dislocker-metadata` dump
pub fn parse_report(text: &str) -> Result<EncryptedKey, ReportError> {
    let lines: Vec<&str> = text.lines().collect();
    let anchor = lines
        .iter()
        .position(|line| line.contains(FVEK_ENTRY_MARKER))
        .ok_or(ReportError::MissingRecord)?;
    let record = Record { lines: &lines, anchor };

    let (line, size_line) = record.line(FVEK_LAYOUT.size, "datum size")?;
    let size: usize = size_regex()
        .captures(size_line)
        .and_then(|caps| caps["size"].parse().ok())
        .ok_or_else(|| ReportError::Malformed {
            field: "datum size",
            line,
            reason: "no \"(<n>) bytes\" size".to_string(),
        })?;
    let payload_len = size
        .checked_sub(DATUM_HEADER_LEN + NONCE_LEN + MAC_LEN)
        .ok_or_else(|| ReportError::Malformed {
            field: "datum size",
            line,
            reason: format!("{} bytes is smaller than the datum header, nonce and MAC", size),
        })?;

    let nonce = record.fixed_hex_field::<NONCE_LEN>(FVEK_LAYOUT.nonce, "nonce")?;
    let mac = record.fixed_hex_field::<MAC_LEN>(FVEK_LAYOUT.mac, "MAC")?;
    let ciphertext = record.payload(FVEK_LAYOUT.payload, payload_len)?;

    Ok(EncryptedKey {
        size,
        nonce,
        mac,
        ciphertext,
    })
}

/// Lines of the report addressed relative to the anchor
struct Record<'a> {
    lines: &'a [&'a str],
    anchor: usize,
}

impl<'a> Record<'a> {
    /// Returns the 1-based line number and the line itself
    fn line(&self, offset: isize, field: &'static str) -> Result<(usize, &'a str), ReportError> {
        let index = self.anchor as isize + offset;
        if index < 0 {
            return Err(ReportError::MissingLine { field, line: 0 });
        }
        let index = index as usize;
        self.lines
            .get(index)
            .map(|line| (index + 1, *line))
            .ok_or(ReportError::MissingLine {
                field,
                line: index + 1,
            })
    }

    fn fixed_hex_field<const N: usize>(
        &self,
        offset: isize,
        field: &'static str,
    ) -> Result<[u8; N], ReportError> {
        let (line, text) = self.line(offset, field)?;
        let data = info_regex()
            .captures(text)
            .map(|caps| caps["data"].to_string())
            .ok_or_else(|| ReportError::Malformed {
                field,
                line,
                reason: "missing [INFO] tag".to_string(),
            })?;
        let bytes = decode_hex(&data, field, line)?;
        let actual = bytes.len();
        bytes.try_into().map_err(|_| ReportError::BadLength {
            field,
            line,
            expected: N,
            actual,
        })
    }

    fn payload(&self, offset: isize, expected: usize) -> Result<Vec<u8>, ReportError> {
        let mut payload = Vec::with_capacity(expected);
        let mut next = offset;

        while payload.len() < expected {
            let (line, text) = self.line(next, "payload")?;
            let caps = payload_regex()
                .captures(text)
                .ok_or_else(|| ReportError::Malformed {
                    field: "payload",
                    line,
                    reason: format!(
                        "expected an offset-prefixed hex line, {} of {} bytes read",
                        payload.len(),
                        expected
                    ),
                })?;
            payload.extend(decode_hex(&caps["data"], "payload", line)?);

            if payload.len() > expected {
                return Err(ReportError::OversizedPayload {
                    line,
                    expected,
                    actual: payload.len(),
                });
            }
            next += 1;
        }

        Ok(payload)
    }
}

/// Decode hex with space and dash separators (`00 11-22 33`)
fn decode_hex(data: &str, field: &'static str, line: usize) -> Result<Vec<u8>, ReportError> {
    let digits: String = data
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    hex::decode(&digits).map_err(|e| ReportError::Malformed {
        field,
        line,
        reason: e.to_string(),
    })
}

/// Render a datum the way `dislocker-metadata` prints it. Used by tests.
#[cfg(test)]
pub(crate) fn render_report(nonce: &[u8], mac: &[u8], ciphertext: &[u8]) -> String {
    fn hex_spaced(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    let prefix = "Mon Oct 19 10:00:00 2026 [INFO]";
    let size = DATUM_HEADER_LEN + nonce.len() + mac.len() + ciphertext.len();

    let mut out = vec![
        format!("{} =======[ Datum n°2 informations ]=======", prefix),
        format!("{} Total datum size: 0x{:04x} ({}) bytes", prefix, size, size),
        format!("{} Datum entry type: 3", prefix),
        format!("{}    `--> ENTRY TYPE FVEK", prefix),
        format!("{} Datum value type: 5", prefix),
        format!("{}    `--> AES-CCM -- Total size header: 36 -- Nested datum: no", prefix),
        format!("{} Status: 0x1", prefix),
        format!("{} Nonce: ", prefix),
        format!("{} {}", prefix, hex_spaced(nonce)),
        format!("{} MAC: ", prefix),
        format!("{} {}", prefix, hex_spaced(mac)),
        format!("{} Payload:", prefix),
    ];
    for (i, line) in ciphertext.chunks(16).enumerate() {
        let (left, right) = line.split_at(line.len().min(8));
        let mut data = hex_spaced(left);
        if !right.is_empty() {
            data.push('-');
            data.push_str(&hex_spaced(right));
        }
        out.push(format!("{} 0x{:08x} {} ", prefix, i * 16, data));
    }
    out.push(format!("{} ", prefix));
    out.push(format!("{} =======================================", prefix));
    out.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonce() -> Vec<u8> {
        hex::decode("80b6a1c2d3e4f50617283940").unwrap()
    }

    fn mac() -> Vec<u8> {
        hex::decode("00112233445566778899aabbccddeeff").unwrap()
    }

    fn ciphertext() -> Vec<u8> {
        (0u8..44).map(|b| b.wrapping_mul(7)).collect()
    }

    #[test]
    fn test_parse_report() {
        let report = render_report(&nonce(), &mac(), &ciphertext());
        let key = parse_report(&report).unwrap();

        assert_eq!(key.size, 80);
        assert_eq!(key.nonce.to_vec(), nonce());
        assert_eq!(key.mac.to_vec(), mac());
        assert_eq!(key.ciphertext, ciphertext());
    }

    #[test]
    fn test_parse_report_crlf() {
        let report = render_report(&nonce(), &mac(), &ciphertext()).replace('\n', "\r\n");
        assert_eq!(parse_report(&report).unwrap().ciphertext, ciphertext());
    }

    #[test]
    fn test_record_not_found() {
        assert_eq!(
            parse_report("[INFO] Datum entry type: 1\n"),
            Err(ReportError::MissingRecord)
        );
    }

    #[test]
    fn test_anchor_on_first_line_has_no_size() {
        let err = parse_report("[INFO] Datum entry type: 3\n").unwrap_err();
        assert!(matches!(err, ReportError::MissingLine { field: "datum size", .. }));
    }

    #[test]
    fn test_bad_nonce_length() {
        let report = render_report(&nonce()[..8], &mac(), &ciphertext());
        let err = parse_report(&report).unwrap_err();
        assert_eq!(
            err,
            ReportError::BadLength {
                field: "nonce",
                line: 9,
                expected: NONCE_LEN,
                actual: 8,
            }
        );
    }

    #[test]
    fn test_bad_mac_hex() {
        let report = render_report(&nonce(), &mac(), &ciphertext())
            .replace("00 11 22 33", "00 1x 22 33");
        let err = parse_report(&report).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "MAC", line: 11, .. }));
    }

    #[test]
    fn test_truncated_report() {
        let report = render_report(&nonce(), &mac(), &ciphertext());
        let truncated: Vec<&str> = report.lines().take(14).collect();
        let err = parse_report(&truncated.join("\n")).unwrap_err();
        assert_eq!(err, ReportError::MissingLine { field: "payload", line: 15 });
    }

    #[test]
    fn test_payload_shorter_than_declared() {
        let report = render_report(&nonce(), &mac(), &ciphertext())
            .replace("(80) bytes", "(96) bytes");
        let err = parse_report(&report).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "payload", line: 16, .. }));
    }

    #[test]
    fn test_payload_longer_than_declared() {
        let report = render_report(&nonce(), &mac(), &ciphertext())
            .replace("(80) bytes", "(70) bytes");
        let err = parse_report(&report).unwrap_err();
        assert_eq!(
            err,
            ReportError::OversizedPayload {
                line: 15,
                expected: 34,
                actual: 44,
            }
        );
    }

    #[test]
    fn test_size_smaller_than_header() {
        let report = render_report(&nonce(), &mac(), &ciphertext())
            .replace("(80) bytes", "(20) bytes");
        let err = parse_report(&report).unwrap_err();
        assert!(matches!(err, ReportError::Malformed { field: "datum size", line: 2, .. }));
    }
}
