//! Per-vault salt kept in a sidecar file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::crypto::{self, SALT_LEN, Salt};
use crate::error::VaultError;

/// Reads and creates the salt sidecar of one vault.
#[derive(Debug, Clone, Copy)]
pub struct SaltStore<'a> {
    path: &'a Path,
}

impl<'a> SaltStore<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Returns the stored salt, generating and persisting one on first use.
    ///
    /// An existing sidecar is never overwritten, even when it is malformed.
    ///
    /// # Errors
    ///
    /// [`VaultError::CorruptSalt`] if the sidecar exists but is unreadable or
    /// not exactly 16 bytes.
    pub fn get_or_create(&self) -> Result<Salt, VaultError> {
        if self.path.exists() {
            return self.read();
        }

        let salt = crypto::generate_salt()?;
        match self.write_new(&salt) {
            Ok(()) => {
                info!(path = %self.path.display(), "created vault salt");
                Ok(salt)
            }
            // someone else created it between the check and the write
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => self.read(),
            Err(e) => Err(VaultError::io(self.path, e)),
        }
    }

    /// Returns the stored salt without ever creating one.
    ///
    /// A missing sidecar is reported as corruption: the caller holds a vault
    /// that cannot be decrypted without it.
    pub fn load_existing(&self) -> Result<Salt, VaultError> {
        if !self.path.exists() {
            return Err(VaultError::corrupt_salt(self.path, "salt file is missing"));
        }
        self.read()
    }

    fn read(&self) -> Result<Salt, VaultError> {
        let bytes = fs::read(self.path)
            .map_err(|e| VaultError::corrupt_salt(self.path, format!("unreadable: {e}")))?;

        let salt: [u8; SALT_LEN] = bytes.as_slice().try_into().map_err(|_| {
            VaultError::corrupt_salt(
                self.path,
                format!("expected {SALT_LEN} bytes, found {}", bytes.len()),
            )
        })?;

        debug!(path = %self.path.display(), "read vault salt");
        Ok(Salt::from_bytes(salt))
    }

    fn write_new(&self, salt: &Salt) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(self.path)?;
        file.write_all(salt.as_bytes())?;
        file.sync_all()
    }
}
