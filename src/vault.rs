//! Encrypted snapshot persistence of a [`RecordSet`].
//!
//! Every save re-encrypts the whole set; every load decrypts it in full.

use std::path::PathBuf;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::crypto::{self, DerivedKey, Salt};
use crate::error::VaultError;
use crate::record::RecordSet;
use crate::salt::SaltStore;
use crate::storage::Storage;

/// Persistence backend behind the ledger controller.
pub trait RecordBackend {
    /// Reads the complete record set; an absent store yields an empty set.
    fn load(&mut self) -> Result<RecordSet, VaultError>;

    /// Replaces the stored record set with `records`.
    fn save(&mut self, records: &RecordSet) -> Result<(), VaultError>;

    fn exists(&self) -> bool;
}

/// Password-protected vault file plus its salt sidecar.
///
/// Construction does no I/O. The key is derived on the first load or save
/// that needs it and kept once it has opened the vault, or created it.
pub struct VaultStore {
    config: VaultConfig,
    storage: Storage,
    password: Zeroizing<String>,
    key: Option<DerivedKey>,
}

impl VaultStore {
    pub fn new(config: VaultConfig, password: Zeroizing<String>) -> Self {
        let storage = Storage::new(config.paths.vault().to_path_buf());
        Self {
            config,
            storage,
            password,
            key: None,
        }
    }

    /// Vault at `path` with sidecars next to it and default KDF settings.
    pub fn open(path: impl Into<PathBuf>, password: Zeroizing<String>) -> Self {
        Self::new(VaultConfig::for_vault(path), password)
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Returns `true` if the vault file exists.
    pub fn exists(&self) -> bool {
        self.storage.exists()
    }

    /// Decrypts the vault into a [`RecordSet`].
    ///
    /// A missing vault is the first-run case: an empty set is returned and no
    /// file is read or created.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CorruptSalt`] if the salt sidecar is missing or malformed
    /// - [`VaultError::Authentication`] on a wrong password or tampered file
    /// - [`VaultError::Deserialization`] if the plaintext is not a record set
    /// - [`VaultError::Io`] if the vault cannot be read
    pub fn load(&mut self) -> Result<RecordSet, VaultError> {
        if !self.storage.exists() {
            debug!(path = %self.config.paths.vault().display(), "no vault yet, starting empty");
            return Ok(RecordSet::new());
        }

        let blob = self.storage.load()?;
        let plaintext = match &self.key {
            Some(key) => crypto::open(key, &blob)?,
            None => {
                let (key, plaintext) = self.unlock(&blob)?;
                self.key = Some(key);
                plaintext
            }
        };

        let records: RecordSet =
            serde_json::from_slice(&plaintext).map_err(VaultError::Deserialization)?;

        info!(records = records.len(), "vault loaded");
        Ok(records)
    }

    /// Encrypts `records` and atomically replaces the vault file.
    ///
    /// Creates the salt sidecar and parent directories on first save. An
    /// existing vault is only replaced once the password has opened it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CorruptSalt`] if the vault exists without a valid salt
    /// - [`VaultError::Authentication`] if the password does not open the existing vault
    /// - [`VaultError::Io`] if the vault or salt cannot be written
    pub fn save(&mut self, records: &RecordSet) -> Result<(), VaultError> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec_pretty(records).map_err(VaultError::Serialization)?,
        );

        let key = match self.key.take() {
            Some(key) => key,
            None if self.storage.exists() => {
                let blob = self.storage.load()?;
                self.unlock(&blob)?.0
            }
            None => {
                let salt = SaltStore::new(self.config.paths.salt()).get_or_create()?;
                self.derive(&salt)
            }
        };
        let blob = crypto::seal(self.key.insert(key), &plaintext)?;

        self.storage.save(&blob)?;
        info!(records = records.len(), "vault saved");
        Ok(())
    }

    /// Derives a key from the existing salt and proves it against `blob`.
    fn unlock(&self, blob: &[u8]) -> Result<(DerivedKey, Zeroizing<Vec<u8>>), VaultError> {
        let salt = SaltStore::new(self.config.paths.salt()).load_existing()?;
        let key = self.derive(&salt);
        let plaintext = crypto::open(&key, blob)?;
        Ok((key, plaintext))
    }

    fn derive(&self, salt: &Salt) -> DerivedKey {
        debug!(iterations = self.config.kdf.iterations(), "deriving vault key");
        crypto::derive_key(self.password.as_bytes(), salt, self.config.kdf)
    }
}

impl RecordBackend for VaultStore {
    fn load(&mut self) -> Result<RecordSet, VaultError> {
        VaultStore::load(self)
    }

    fn save(&mut self, records: &RecordSet) -> Result<(), VaultError> {
        VaultStore::save(self, records)
    }

    fn exists(&self) -> bool {
        VaultStore::exists(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultPaths;
    use crate::crypto::KdfParams;
    use crate::money::Amount;
    use crate::record::{Category, Record};
    use std::fs;
    use tempfile::tempdir;

    fn store(path: &std::path::Path, password: &str) -> VaultStore {
        let config = VaultConfig::for_vault(path).with_kdf(KdfParams::new(1_000).unwrap());
        VaultStore::new(config, Zeroizing::new(password.to_string()))
    }

    fn sample() -> RecordSet {
        [
            Record::new(
                Category::Income,
                Amount::parse("1000.00").unwrap(),
                "Salary".into(),
                None,
                vec![],
            ),
            Record::new(
                Category::Expense,
                Amount::parse("12.345").unwrap(),
                "Coffee beans".into(),
                None,
                vec!["food".into(), "beans".into(), "food".into()],
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn load_without_vault_is_empty_and_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("v.vault");

        let mut vault = store(&path, "pw");
        assert!(vault.load().unwrap().is_empty());
        assert!(!vault.exists());

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn save_then_fresh_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let records = sample();

        store(&path, "pw").save(&records).unwrap();
        let loaded = store(&path, "pw").load().unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn empty_set_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");

        store(&path, "pw").save(&RecordSet::new()).unwrap();

        let mut vault = store(&path, "pw");
        assert!(vault.exists());
        assert!(vault.load().unwrap().is_empty());
    }

    #[test]
    fn wrong_password_is_authentication_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        store(&path, "correct-horse").save(&sample()).unwrap();

        match store(&path, "wrong").load() {
            Err(VaultError::Authentication) => {}
            other => panic!("expected Authentication, got: {other:?}"),
        }
    }

    #[test]
    fn salt_is_stable_across_saves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let salt_path = dir.path().join("v.salt");

        store(&path, "pw").save(&sample()).unwrap();
        let first = fs::read(&salt_path).unwrap();

        store(&path, "pw").save(&RecordSet::new()).unwrap();
        let second = fs::read(&salt_path).unwrap();

        assert_eq!(first.len(), crypto::SALT_LEN);
        assert_eq!(first, second);
    }

    #[test]
    fn any_flipped_byte_fails_authentication() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let mut vault = store(&path, "pw");
        vault.save(&sample()).unwrap();
        let original = fs::read(&path).unwrap();

        for i in 0..original.len() {
            let mut tampered = original.clone();
            tampered[i] ^= 0x01;
            fs::write(&path, &tampered).unwrap();

            assert!(
                matches!(vault.load(), Err(VaultError::Authentication)),
                "byte {i} was not detected"
            );
        }
    }

    #[test]
    fn truncated_vault_fails_authentication() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        store(&path, "pw").save(&sample()).unwrap();

        let original = fs::read(&path).unwrap();
        fs::write(&path, &original[..original.len() / 2]).unwrap();

        assert!(matches!(store(&path, "pw").load(), Err(VaultError::Authentication)));
    }

    #[test]
    fn missing_salt_beside_vault_is_corrupt_and_not_recreated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let salt_path = dir.path().join("v.salt");
        store(&path, "pw").save(&sample()).unwrap();
        fs::remove_file(&salt_path).unwrap();

        assert!(matches!(store(&path, "pw").load(), Err(VaultError::CorruptSalt { .. })));
        assert!(!salt_path.exists());
    }

    #[test]
    fn save_over_vault_without_salt_is_corrupt_and_leaves_vault_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let salt_path = dir.path().join("v.salt");
        let records = sample();
        store(&path, "pw").save(&records).unwrap();

        let backup = dir.path().join("v.salt.bak");
        fs::rename(&salt_path, &backup).unwrap();
        let before = fs::read(&path).unwrap();

        assert!(matches!(
            store(&path, "pw").save(&RecordSet::new()),
            Err(VaultError::CorruptSalt { .. })
        ));
        assert!(!salt_path.exists());
        assert_eq!(fs::read(&path).unwrap(), before);

        fs::rename(&backup, &salt_path).unwrap();
        assert_eq!(store(&path, "pw").load().unwrap(), records);
    }

    #[test]
    fn failed_load_does_not_let_save_rekey_the_vault() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let records = sample();
        store(&path, "correct-horse").save(&records).unwrap();

        let mut wrong = store(&path, "wrong");
        assert!(matches!(wrong.load(), Err(VaultError::Authentication)));
        assert!(matches!(
            wrong.save(&RecordSet::new()),
            Err(VaultError::Authentication)
        ));

        assert_eq!(store(&path, "correct-horse").load().unwrap(), records);
    }

    #[test]
    fn save_with_wrong_password_keeps_existing_vault() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let records = sample();
        store(&path, "pw").save(&records).unwrap();

        assert!(matches!(
            store(&path, "other").save(&RecordSet::new()),
            Err(VaultError::Authentication)
        ));
        assert_eq!(store(&path, "pw").load().unwrap(), records);
    }

    #[test]
    fn save_after_load_reuses_verified_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        store(&path, "pw").save(&sample()).unwrap();

        let mut vault = store(&path, "pw");
        let mut records = vault.load().unwrap();
        records.push(Record::new(
            Category::Expense,
            Amount::parse("4.50").unwrap(),
            "Bus".into(),
            None,
            vec![],
        ));
        vault.save(&records).unwrap();

        assert_eq!(store(&path, "pw").load().unwrap(), records);
    }

    #[test]
    fn malformed_salt_is_corrupt_on_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        fs::write(dir.path().join("v.salt"), [0u8; 15]).unwrap();

        assert!(matches!(
            store(&path, "pw").save(&sample()),
            Err(VaultError::CorruptSalt { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn undecodable_plaintext_is_deserialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        let salt = SaltStore::new(&dir.path().join("v.salt")).get_or_create().unwrap();
        let key = crypto::derive_key(b"pw", &salt, KdfParams::new(1_000).unwrap());
        fs::write(&path, crypto::seal(&key, br#"{"entries": []}"#).unwrap()).unwrap();

        assert!(matches!(store(&path, "pw").load(), Err(VaultError::Deserialization(_))));
    }

    #[test]
    fn vault_does_not_contain_plaintext() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.vault");
        store(&path, "pw").save(&sample()).unwrap();

        let raw = fs::read(&path).unwrap();
        assert!(!raw.windows(b"Salary".len()).any(|w| w == b"Salary"));
        assert!(!raw.windows(b"records".len()).any(|w| w == b"records"));
    }

    #[test]
    fn explicit_sidecar_locations_are_used() {
        let dir = tempdir().unwrap();
        let paths = VaultPaths::new(
            dir.path().join("data").join("ledger.bin"),
            dir.path().join("keys").join("ledger-salt"),
            dir.path().join("ledger.lock"),
        );
        let config = VaultConfig::new(paths.clone(), KdfParams::new(1_000).unwrap());

        VaultStore::new(config.clone(), Zeroizing::new("pw".into()))
            .save(&sample())
            .unwrap();

        assert!(paths.vault().exists());
        assert_eq!(fs::read(paths.salt()).unwrap().len(), crypto::SALT_LEN);
        assert_eq!(
            VaultStore::new(config, Zeroizing::new("pw".into())).load().unwrap().len(),
            2
        );
    }

    #[test]
    fn backend_trait_delegates() {
        let dir = tempdir().unwrap();
        let mut backend: Box<dyn RecordBackend> = Box::new(store(&dir.path().join("v.vault"), "pw"));

        assert!(!backend.exists());
        backend.save(&sample()).unwrap();
        assert!(backend.exists());
        assert_eq!(backend.load().unwrap().len(), 2);
    }
}
