use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{KEY_LEN, Salt};
use crate::error::VaultError;

/// PBKDF2 iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 100_000;
/// Lowest iteration count accepted by [`KdfParams::new`].
pub const MIN_ITERATIONS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> Result<Self, VaultError> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.iterations < MIN_ITERATIONS {
            return Err(VaultError::InvalidKdfParams(format!(
                "pbkdf2 iterations must be >= {MIN_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// 256-bit key derived from the vault password. Zeroized on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the vault key with PBKDF2-HMAC-SHA256.
///
/// Deterministic in `(password, salt, params)`. A wrong password still yields
/// a key; it is rejected later when the vault fails authentication.
pub fn derive_key(password: &[u8], salt: &Salt, params: KdfParams) -> DerivedKey {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), params.iterations, &mut key[..]);
    DerivedKey(key)
}
