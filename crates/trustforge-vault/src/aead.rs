//! AES-256-GCM sealing of small secrets.
//!
//! Wire format is `base64(nonce || tag || ciphertext)` with a 96-bit
//! nonce and a 128-bit tag.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::VaultError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under a 256-bit key.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<String, VaultError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    // The AEAD implementation appends the tag to the ciphertext;
    // reorder to nonce || tag || ciphertext.
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let mut combined = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(tag);
    combined.extend_from_slice(ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt a value produced by [`seal`].
pub fn open(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, VaultError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, rest) = combined.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|e| VaultError::Crypto(format!("AES-GCM decrypt: {e}")))
}
