//! Vault location and key derivation settings.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::crypto::KdfParams;

/// File name of the vault inside the platform data directory.
pub const DEFAULT_VAULT_FILE: &str = "finance.vault";

const SALT_EXT: &str = "salt";
const LOCK_EXT: &str = "lock";

/// Every path a vault touches on disk.
///
/// Built once and handed to each component, so no component derives a
/// sidecar location on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    vault: PathBuf,
    salt: PathBuf,
    lock: PathBuf,
}

impl VaultPaths {
    /// Explicit locations for the vault and its sidecars.
    pub fn new(vault: PathBuf, salt: PathBuf, lock: PathBuf) -> Self {
        Self { vault, salt, lock }
    }

    /// Derives the sidecars from the vault path: `finance.vault` gets
    /// `finance.salt` and `finance.lock` next to it.
    pub fn for_vault(vault: impl Into<PathBuf>) -> Self {
        let vault = vault.into();
        let salt = sidecar(&vault, SALT_EXT);
        let lock = sidecar(&vault, LOCK_EXT);
        Self { vault, salt, lock }
    }

    pub fn vault(&self) -> &Path {
        &self.vault
    }

    pub fn salt(&self) -> &Path {
        &self.salt
    }

    pub fn lock(&self) -> &Path {
        &self.lock
    }
}

/// Swaps the extension, or appends it when the vault already carries it.
fn sidecar(vault: &Path, ext: &str) -> PathBuf {
    if vault.extension().is_some_and(|e| e == ext) {
        let mut name = OsString::from(vault.as_os_str());
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    } else {
        vault.with_extension(ext)
    }
}

/// Configuration of a single vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub paths: VaultPaths,
    pub kdf: KdfParams,
}

impl VaultConfig {
    pub fn new(paths: VaultPaths, kdf: KdfParams) -> Self {
        Self { paths, kdf }
    }

    /// Vault at `path` with default sidecars and KDF settings.
    pub fn for_vault(path: impl Into<PathBuf>) -> Self {
        Self::new(VaultPaths::for_vault(path), KdfParams::default())
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }
}

/// Vault location inside the platform data directory.
pub fn default_vault_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "finvault")?;
    Some(project_dirs.data_dir().join(DEFAULT_VAULT_FILE))
}
