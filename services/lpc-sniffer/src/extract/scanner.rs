//! VMK marker search over the clean TPM stream

use memchr::memmem;
use tracing::debug;

use crate::key::{KeyPayload, KEY_SIZE};

/// Header of the VMK structure as it crosses the bus
pub const VMK_MARKER: [u8; 12] = [
    0x2c, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x20, 0x00, 0x00,
];

/// Scanner progress. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Searching,
    /// Marker found, key bytes still arriving
    MatchPending { marker_at: usize },
    Complete { marker_at: usize },
}

impl ScanState {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanState::Complete { .. })
    }
}

/// Finds the first marker occurrence and yields the key once all of it is present
pub struct PatternScanner {
    state: ScanState,
    finder: memmem::Finder<'static>,
    /// Earliest offset a not-yet-seen marker could start at
    search_from: usize,
}

impl PatternScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Searching,
            finder: memmem::Finder::new(&VMK_MARKER).into_owned(),
            search_from: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Inspect the clean stream after an append. `clean` must be the same
    /// append-only buffer on every call.
    ///
    /// Returns the key exactly once, on the transition to `Complete`.
    pub fn scan(&mut self, clean: &[u8]) -> Option<KeyPayload> {
        if self.state == ScanState::Searching {
            let from = self.search_from.min(clean.len());
            match self.finder.find(&clean[from..]) {
                Some(offset) => {
                    let marker_at = from + offset;
                    debug!("VMK marker found at clean offset {}", marker_at);
                    self.state = ScanState::MatchPending { marker_at };
                }
                None => {
                    self.search_from = clean.len().saturating_sub(VMK_MARKER.len() - 1);
                    return None;
                }
            }
        }

        match self.state {
            ScanState::MatchPending { marker_at } => {
                let key_start = marker_at + VMK_MARKER.len();
                let key_end = key_start + KEY_SIZE;
                if clean.len() < key_end {
                    debug!(
                        "VMK marker at {}: {} of {} key bytes so far",
                        marker_at,
                        clean.len() - key_start.min(clean.len()),
                        KEY_SIZE
                    );
                    return None;
                }

                let key = KeyPayload::from_slice(&clean[key_start..key_end])?;
                self.state = ScanState::Complete { marker_at };
                Some(key)
            }
            _ => None,
        }
    }
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}
