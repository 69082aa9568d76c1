pub mod config;
pub mod crypto;
mod error;
mod lock;
pub mod money;
pub mod record;
mod salt;
mod storage;
mod vault;

use std::fmt;

use chrono::NaiveDateTime;
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

pub use crate::config::{VaultConfig, VaultPaths, default_vault_path};
pub use crate::crypto::KdfParams;
pub use crate::error::{LedgerError, VaultError};
pub use crate::lock::VaultLock;
pub use crate::money::Amount;
pub use crate::record::{Category, Record, RecordSet};
pub use crate::salt::SaltStore;
pub use crate::storage::Storage;
pub use crate::vault::{RecordBackend, VaultStore};

/// Finance controller over a record backend.
///
/// Holds the decrypted records in memory and writes the full set back after
/// every change.
pub struct Ledger<B: RecordBackend = VaultStore> {
    records: RecordSet,
    backend: B,
    _lock: Option<VaultLock>,
}

impl Ledger<VaultStore> {
    /// Locks the vault for this session and loads its records.
    ///
    /// # Errors
    ///
    /// [`VaultError::Locked`] if another session has the vault open, or any
    /// load failure of [`VaultStore::load`].
    pub fn open(config: VaultConfig, password: Zeroizing<String>) -> Result<Self, LedgerError> {
        let lock = VaultLock::acquire(config.paths.lock())?;
        let mut ledger = Self::with_backend(VaultStore::new(config, password))?;
        ledger._lock = Some(lock);
        Ok(ledger)
    }

    pub fn info(&self) -> LedgerInfo {
        LedgerInfo {
            paths: self.backend.config().paths.clone(),
            kdf_iterations: self.backend.config().kdf.iterations(),
            exists: self.backend.exists(),
            records: self.records.len(),
        }
    }
}

impl<B: RecordBackend> Ledger<B> {
    /// Loads the records of `backend` without taking a session lock.
    pub fn with_backend(mut backend: B) -> Result<Self, LedgerError> {
        let records = backend.load()?;
        Ok(Self {
            records,
            backend,
            _lock: None,
        })
    }

    /// Adds a record and persists the whole set.
    ///
    /// `date` defaults to the current local time. The record is only kept in
    /// memory if the save succeeds.
    pub fn add_record(
        &mut self,
        category: Category,
        amount: Amount,
        description: &str,
        date: Option<NaiveDateTime>,
        tags: Vec<String>,
    ) -> Result<Record, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::EmptyDescription);
        }

        let record = Record::new(category, amount, description.to_string(), date, tags);

        let mut next = self.records.clone();
        next.push(record.clone());
        self.backend.save(&next)?;
        self.records = next;

        info!(id = %record.id(), %category, "record added");
        Ok(record)
    }

    pub fn get_record(&self, id: &Uuid) -> Option<&Record> {
        self.records.get(id)
    }

    /// Records matching every given filter, in insertion order.
    pub fn list_records(&self, category: Option<Category>, tag: Option<&str>) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| category.is_none_or(|c| r.category() == c))
            .filter(|r| tag.is_none_or(|t| r.has_tag(t)))
            .collect()
    }

    /// Deletes a record; returns `false` without saving if no record has `id`.
    pub fn delete_record(&mut self, id: &Uuid) -> Result<bool, LedgerError> {
        let mut next = self.records.clone();
        if next.remove(id).is_none() {
            debug!(%id, "record not found");
            return Ok(false);
        }

        self.backend.save(&next)?;
        self.records = next;
        info!(%id, "record deleted");
        Ok(true)
    }

    /// Income minus expenses.
    pub fn balance(&self) -> Amount {
        self.records
            .iter()
            .fold(Amount::zero(), |balance, r| match r.category() {
                Category::Income => balance + r.amount().clone(),
                Category::Expense => balance - r.amount().clone(),
            })
    }

    pub fn total_by_category(&self, category: Category) -> Amount {
        self.records
            .iter()
            .filter(|r| r.category() == category)
            .fold(Amount::zero(), |total, r| total + r.amount().clone())
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Summary of an open ledger.
#[derive(Debug, Clone)]
pub struct LedgerInfo {
    pub paths: VaultPaths,
    pub kdf_iterations: u32,
    pub exists: bool,
    pub records: usize,
}

impl fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vault:       {}", self.paths.vault().display())?;
        writeln!(f, "Salt:        {}", self.paths.salt().display())?;
        writeln!(f, "Lock:        {}", self.paths.lock().display())?;
        writeln!(f, "Exists:      {}", if self.exists { "yes" } else { "no" })?;
        writeln!(f, "KDF:         PBKDF2-HMAC-SHA256, {} iterations", self.kdf_iterations)?;
        write!(f, "Records:     {}", self.records)
    }
}
