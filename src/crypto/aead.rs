//! XChaCha20-Poly1305 sealing of the vault payload.
//!
//! Blob layout:
//! ```text
//! NONCE (24) | CIPHERTEXT | TAG (16)
//! ```

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{DerivedKey, NONCE_LEN, SALT_LEN, Salt, TAG_LEN};
use crate::error::VaultError;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<(), VaultError> {
    fill(buf).map_err(|_| VaultError::Random)
}

/// Generate salt
pub fn generate_salt() -> Result<Salt, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(Salt::from_bytes(salt))
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// The nonce is prepended to the returned blob so [`open`] only needs the key.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| VaultError::Encryption)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt and authenticate a blob produced by [`seal`].
///
/// Wrong keys, truncated blobs and tampered bytes all yield
/// [`VaultError::Authentication`].
pub fn open(key: &DerivedKey, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::Authentication);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::Authentication)?;
    Ok(Zeroizing::new(plaintext))
}
