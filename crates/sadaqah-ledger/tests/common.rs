//! Common test utilities for ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use sadaqah_core::{
    BoxId, Collection, CollectionId, Currency, CurrencyId, CurrencyType, CurrencyTypeId, Sadaqah,
    SadaqahBox, SadaqahId, Tag, TagId, UserId,
};
use sadaqah_ledger::{AddContribution, AddOutcome, Engine, LedgerConfig};
use sadaqah_store::{MemoryStore, Store, StoreError, WriteOp, WriteSet};

/// Engine seeded with gold (canonical), US dollar and euro.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Engine,
    /// Canonical currency, 2000 USD per gram.
    pub gold: Currency,
    /// 1 USD.
    pub usd: Currency,
    /// 1.08 USD.
    pub eur: Currency,
    /// Owner of every box the harness creates.
    pub owner: UserId,
    /// Keeps a `RocksDB` directory alive for the test's duration.
    pub _temp_dir: Option<TempDir>,
}

impl TestHarness {
    /// Harness over an in-memory store with default config.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Harness over an in-memory store.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// Harness over any store.
    pub fn with_store(store: Arc<dyn Store>, config: LedgerConfig) -> Self {
        let engine = Engine::new(store, config).expect("Failed to build engine");
        Self::seed(engine, None)
    }

    /// Harness over a fresh `RocksDB` directory.
    pub fn rocks(config: LedgerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = LedgerConfig {
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            ..config
        };
        let engine = Engine::open(config).expect("Failed to open engine");
        Self::seed(engine, Some(temp_dir))
    }

    fn seed(engine: Engine, temp_dir: Option<TempDir>) -> Self {
        let gold = Currency::new("XAU", "Gold (gram)", Some(dec!(2000)));
        let usd = Currency::new("USD", "US Dollar", Some(dec!(1))).with_symbol("$");
        let eur = Currency::new("EUR", "Euro", Some(dec!(1.08))).with_symbol("€");
        for currency in [&gold, &usd, &eur] {
            engine
                .reference()
                .create_currency(currency)
                .expect("Failed to seed currency");
        }

        Self {
            engine,
            gold,
            usd,
            eur,
            owner: UserId::generate(),
            _temp_dir: temp_dir,
        }
    }

    /// Create an empty box.
    pub fn new_box(&self) -> SadaqahBox {
        self.engine
            .ledger()
            .create_box(self.owner, "Test box", None)
            .expect("Failed to create box")
    }

    /// The request for depositing `amount` of `currency`.
    pub fn request(&self, box_id: BoxId, amount: Decimal, currency: &Currency) -> AddContribution {
        AddContribution::new(box_id, amount, currency.id, self.owner)
    }

    /// Deposit and unwrap.
    pub fn add(&self, box_id: BoxId, amount: Decimal, currency: &Currency) -> AddOutcome {
        self.engine
            .ledger()
            .add_contribution(self.request(box_id, amount, currency))
            .expect("Failed to add contribution")
    }

    /// Current box state.
    pub fn stored_box(&self, box_id: &BoxId) -> SadaqahBox {
        self.engine.ledger().get_box(box_id).expect("Box missing")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Store wrapper that fails commits on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    conflicts: AtomicU32,
    failures: AtomicU32,
    commits: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` commits as if the box version moved.
    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` commits with a database error.
    pub fn inject_failures(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Commits attempted so far, successful or not.
    pub fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Store for FlakyStore {
    fn put_currency(&self, currency: &Currency) -> sadaqah_store::Result<()> {
        self.inner.put_currency(currency)
    }

    fn get_currency(&self, currency_id: &CurrencyId) -> sadaqah_store::Result<Option<Currency>> {
        self.inner.get_currency(currency_id)
    }

    fn find_currency_by_code(&self, code: &str) -> sadaqah_store::Result<Option<Currency>> {
        self.inner.find_currency_by_code(code)
    }

    fn list_currencies(&self) -> sadaqah_store::Result<Vec<Currency>> {
        self.inner.list_currencies()
    }

    fn delete_currency(&self, currency_id: &CurrencyId) -> sadaqah_store::Result<()> {
        self.inner.delete_currency(currency_id)
    }

    fn put_currency_type(&self, currency_type: &CurrencyType) -> sadaqah_store::Result<()> {
        self.inner.put_currency_type(currency_type)
    }

    fn get_currency_type(
        &self,
        currency_type_id: &CurrencyTypeId,
    ) -> sadaqah_store::Result<Option<CurrencyType>> {
        self.inner.get_currency_type(currency_type_id)
    }

    fn find_currency_type_by_name(&self, name: &str) -> sadaqah_store::Result<Option<CurrencyType>> {
        self.inner.find_currency_type_by_name(name)
    }

    fn list_currency_types(&self) -> sadaqah_store::Result<Vec<CurrencyType>> {
        self.inner.list_currency_types()
    }

    fn delete_currency_type(&self, currency_type_id: &CurrencyTypeId) -> sadaqah_store::Result<()> {
        self.inner.delete_currency_type(currency_type_id)
    }

    fn put_tag(&self, tag: &Tag) -> sadaqah_store::Result<()> {
        self.inner.put_tag(tag)
    }

    fn get_tag(&self, tag_id: &TagId) -> sadaqah_store::Result<Option<Tag>> {
        self.inner.get_tag(tag_id)
    }

    fn find_tag_by_name(&self, name: &str) -> sadaqah_store::Result<Option<Tag>> {
        self.inner.find_tag_by_name(name)
    }

    fn list_tags(&self) -> sadaqah_store::Result<Vec<Tag>> {
        self.inner.list_tags()
    }

    fn delete_tag(&self, tag_id: &TagId) -> sadaqah_store::Result<()> {
        self.inner.delete_tag(tag_id)
    }

    fn get_box(&self, box_id: &BoxId) -> sadaqah_store::Result<Option<SadaqahBox>> {
        self.inner.get_box(box_id)
    }

    fn get_contribution(&self, sadaqah_id: &SadaqahId) -> sadaqah_store::Result<Option<Sadaqah>> {
        self.inner.get_contribution(sadaqah_id)
    }

    fn list_contributions_by_box(&self, box_id: &BoxId) -> sadaqah_store::Result<Vec<Sadaqah>> {
        self.inner.list_contributions_by_box(box_id)
    }

    fn get_collection(
        &self,
        collection_id: &CollectionId,
    ) -> sadaqah_store::Result<Option<Collection>> {
        self.inner.get_collection(collection_id)
    }

    fn list_collections_by_box(&self, box_id: &BoxId) -> sadaqah_store::Result<Vec<Collection>> {
        self.inner.list_collections_by_box(box_id)
    }

    fn commit(&self, batch: WriteSet) -> sadaqah_store::Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);

        if Self::take(&self.failures) {
            return Err(StoreError::Database("injected failure".into()));
        }
        if Self::take(&self.conflicts) {
            let id = batch
                .ops()
                .iter()
                .find_map(|op| match op {
                    WriteOp::PutBox { record, .. } => Some(record.id.to_string()),
                    _ => None,
                })
                .unwrap_or_default();
            return Err(StoreError::Conflict { entity: "box", id });
        }
        self.inner.commit(batch)
    }
}
