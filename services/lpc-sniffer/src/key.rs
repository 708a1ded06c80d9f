//! Captured BitLocker Volume Master Key

use std::fs;
use std::path::Path;

use crate::error::CaptureError;

/// Size of the BitLocker Volume Master Key in bytes
pub const KEY_SIZE: usize = 32;

/// The 32-byte key payload that follows the VMK marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPayload([u8; KEY_SIZE]);

impl KeyPayload {
    /// Copy a key out of the clean stream. Returns `None` unless `bytes` is exactly `KEY_SIZE` long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Write the raw key bytes to `path`, replacing any previous file
    pub fn persist(&self, path: &Path) -> Result<(), CaptureError> {
        fs::write(path, self.0).map_err(|source| CaptureError::KeyWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}
