//! AES-CCM decryption of the FVEK and the dislocker key file format

use aes::Aes256;
use ccm::aead::generic_array::GenericArray;
use ccm::aead::{AeadInPlace, KeyInit};
use ccm::aead::consts::{U12, U16};
use ccm::Ccm;
use thiserror::Error;

use crate::report::{MAC_LEN, NONCE_LEN};

/// BitLocker protects the FVEK with AES-256-CCM, 16-byte tag, 12-byte nonce
pub type Aes256Ccm = Ccm<Aes256, U16, U12>;

pub const VMK_LEN: usize = 32;

/// Key structure header preceding the FVEK in the decrypted payload
pub const FVEK_HEADER_LEN: usize = 12;

/// dislocker `--fvek` file: encryption method, key, zero padding to 64 key bytes
const FVEK_FILE_METHOD: [u8; 2] = [0x00, 0x80];
const FVEK_FILE_PADDING: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("VMK must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("authentication failed: wrong VMK or corrupted FVEK datum")]
    AuthenticationFailed,

    #[error("decrypted key structure too short: {0} bytes")]
    PlaintextTooShort(usize),
}

/// Verify and decrypt an AES-CCM ciphertext with a detached MAC
pub fn decrypt_aes_ccm(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    mac: &[u8; MAC_LEN],
) -> Result<Vec<u8>, DecryptError> {
    if key.len() != VMK_LEN {
        return Err(DecryptError::InvalidKeyLength(key.len()));
    }
    let cipher = Aes256Ccm::new_from_slice(key)
        .map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce.as_slice()),
            &[],
            &mut buffer,
            GenericArray::from_slice(mac.as_slice()),
        )
        .map_err(|_| DecryptError::AuthenticationFailed)?;

    Ok(buffer)
}

/// Strip the key structure header from the decrypted payload
pub fn extract_fvek(plaintext: &[u8]) -> Result<&[u8], DecryptError> {
    if plaintext.len() < FVEK_HEADER_LEN {
        return Err(DecryptError::PlaintextTooShort(plaintext.len()));
    }
    Ok(&plaintext[FVEK_HEADER_LEN..])
}

/// Build the key file `dislocker --fvek` expects
pub fn fvek_file_contents(fvek: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FVEK_FILE_METHOD.len() + fvek.len() + FVEK_FILE_PADDING);
    out.extend_from_slice(&FVEK_FILE_METHOD);
    out.extend_from_slice(fvek);
    out.resize(out.len() + FVEK_FILE_PADDING, 0);
    out
}

/// Encrypt with a detached MAC. Used by tests to build datums.
#[cfg(test)]
pub(crate) fn encrypt_aes_ccm(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> (Vec<u8>, [u8; MAC_LEN]) {
    let cipher = Aes256Ccm::new_from_slice(key).unwrap();
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_slice()), &[], &mut buffer)
        .unwrap();
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&tag);
    (buffer, mac)
}
