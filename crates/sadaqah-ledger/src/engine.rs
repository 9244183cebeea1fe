//! Process-wide bundle of store, reference data and ledger.

use std::sync::Arc;

use sadaqah_store::{MemoryStore, RocksStore, Store};

use crate::config::LedgerConfig;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::reference::ReferenceData;

/// Everything a caller needs, built once and passed around explicitly.
pub struct Engine {
    store: Arc<dyn Store>,
    reference: Arc<ReferenceData>,
    ledger: Ledger,
    config: LedgerConfig,
}

impl Engine {
    /// Wire an engine around an existing store.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(store: Arc<dyn Store>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let reference = Arc::new(ReferenceData::new(store.clone(), &config));
        let ledger = Ledger::new(store.clone(), reference.clone(), config.clone());

        Ok(Self {
            store,
            reference,
            ledger,
            config,
        })
    }

    /// Open the `RocksDB` store at `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database cannot be opened.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        tracing::info!(path = %config.data_dir, "Opening RocksDB store");
        let store = RocksStore::open(&config.data_dir)?;
        Self::new(Arc::new(store), config)
    }

    /// Engine over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `config` does not validate.
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// The contribution ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Cached reference data.
    #[must_use]
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerError;

    #[test]
    fn rejects_invalid_config() {
        let config = LedgerConfig {
            canonical_currency: "  ".into(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            Engine::in_memory(config),
            Err(LedgerError::Configuration(_))
        ));
    }

    #[test]
    fn opens_rocksdb_in_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LedgerConfig {
            data_dir: dir.path().join("db").to_string_lossy().into_owned(),
            ..LedgerConfig::default()
        };
        let engine = Engine::open(config).unwrap();
        assert_eq!(engine.config().canonical_currency, "XAU");
        assert!(engine.store().list_currencies().unwrap().is_empty());
    }
}
