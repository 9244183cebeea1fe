//! The contribution ledger.
//!
//! Owns every write to a box's running aggregate `(count, total_value,
//! currency_id)`. Each transition reads the box, computes the new state and
//! commits one `WriteSet` whose box write is guarded by the version it read.
//! If another writer got there first the store rejects the whole set and the
//! transition is recomputed from fresh state.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sadaqah_core::{
    to_canonical, BoxId, Collection, CollectionId, Currency, CurrencyId, MissingRatePolicy,
    Sadaqah, SadaqahBox, SadaqahId, UserId,
};
use sadaqah_store::{Precondition, Store, WriteSet};
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::reference::ReferenceData;

// ============================================================================
// Request / Outcome Types
// ============================================================================

/// Request to deposit into a box.
#[derive(Debug, Clone)]
pub struct AddContribution {
    /// Target box.
    pub box_id: BoxId,
    /// Per-unit amount in `currency_id`. Must be positive.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency_id: CurrencyId,
    /// Identical deposits to fold into one row (`None` means one).
    pub repeat_count: Option<u32>,
    /// Depositor.
    pub owner_id: UserId,
}

impl AddContribution {
    /// A single deposit.
    #[must_use]
    pub const fn new(
        box_id: BoxId,
        amount: Decimal,
        currency_id: CurrencyId,
        owner_id: UserId,
    ) -> Self {
        Self {
            box_id,
            amount,
            currency_id,
            repeat_count: None,
            owner_id,
        }
    }

    /// Fold `count` identical deposits into one row.
    #[must_use]
    pub const fn repeated(mut self, count: u32) -> Self {
        self.repeat_count = Some(count);
        self
    }
}

/// Result of an add.
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    /// The stored contribution row.
    pub contribution: Sadaqah,
    /// The box after the add.
    pub updated_box: SadaqahBox,
}

/// Result of a remove.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveOutcome {
    /// The box after the remove.
    pub updated_box: SadaqahBox,
}

/// Result of a collect.
#[derive(Debug, Clone, Serialize)]
pub struct CollectOutcome {
    /// Snapshot of the box as it was emptied.
    pub collection: Collection,
    /// The box after the reset.
    pub reset_box: SadaqahBox,
}

// ============================================================================
// Ledger
// ============================================================================

/// Box aggregate state machine.
pub struct Ledger {
    store: Arc<dyn Store>,
    reference: Arc<ReferenceData>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger over `store`, resolving currencies through `reference`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, reference: Arc<ReferenceData>, config: LedgerConfig) -> Self {
        Self {
            store,
            reference,
            config,
        }
    }

    /// Create an empty box.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store write fails.
    pub fn create_box(
        &self,
        owner_id: UserId,
        name: &str,
        description: Option<String>,
    ) -> Result<SadaqahBox> {
        let mut sadaqah_box = SadaqahBox::new(owner_id, name);
        sadaqah_box.description = description;
        self.store.create_box(&sadaqah_box)?;

        tracing::info!(box_id = %sadaqah_box.id, owner_id = %owner_id, "Box created");
        Ok(sadaqah_box)
    }

    /// Deposit into a box.
    ///
    /// With `repeat_count = n` one row worth `amount * n` is stored and the box
    /// count still grows by one.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive amount, a zero repeat count, a
    ///   value too large to convert or total, or a value too small to register
    ///   in the canonical currency under `FailClosed`
    /// - `BoxNotFound` / `CurrencyNotFound` for unknown references
    /// - `ConversionUnavailable` when a rate is missing under `FailClosed`
    /// - `WriteConflict` when retries run out
    pub fn add_contribution(&self, request: AddContribution) -> Result<AddOutcome> {
        let repeat_count = request.repeat_count.unwrap_or(1);
        if repeat_count == 0 {
            return Err(LedgerError::InvalidAmount(
                "repeat count must be at least 1".into(),
            ));
        }
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        let value = request
            .amount
            .checked_mul(Decimal::from(repeat_count))
            .ok_or_else(|| LedgerError::InvalidAmount("amount is too large".into()))?;

        let box_id = request.box_id;
        self.get_box(&box_id)?;

        let currency = self.reference.currency(&request.currency_id)?.ok_or_else(|| {
            LedgerError::CurrencyNotFound {
                currency: request.currency_id.to_string(),
            }
        })?;
        let canonical_value = self.canonical_value(value, &currency)?;

        let contribution = Sadaqah {
            id: SadaqahId::generate(),
            box_id,
            value,
            currency_id: currency.id,
            canonical_value,
            repeat_count,
            owner_id: request.owner_id,
            created_at: Utc::now(),
        };

        let updated_box = self.transition(&box_id, "add", |current| {
            let mut next = advance(current);
            next.count += 1;
            next.total_value = current
                .total_value
                .checked_add(canonical_value)
                .ok_or_else(|| LedgerError::InvalidAmount("box total would overflow".into()))?;
            if next.currency_id.is_none() {
                next.currency_id = Some(currency.id);
            }

            let mut batch = WriteSet::new();
            batch
                .put_contribution(contribution.clone())
                .put_box(next.clone(), Precondition::Version(current.version));
            Ok((batch, next))
        })?;

        tracing::info!(
            box_id = %box_id,
            sadaqah_id = %contribution.id,
            currency = %currency.code,
            value = %value,
            repeat_count,
            canonical_value = %canonical_value,
            total_value = %updated_box.total_value,
            "Contribution added"
        );

        Ok(AddOutcome {
            contribution,
            updated_box,
        })
    }

    /// Remove one contribution from a box.
    ///
    /// The box total drops by the canonical value recorded when the row was
    /// added, so later rate corrections do not skew it.
    ///
    /// # Errors
    ///
    /// - `BoxNotFound` if the box does not exist
    /// - `ContributionNotFound` if the contribution is not in this box
    /// - `WriteConflict` when retries run out
    pub fn remove_contribution(
        &self,
        box_id: &BoxId,
        contribution_id: &SadaqahId,
    ) -> Result<RemoveOutcome> {
        let updated_box = self.transition(box_id, "remove", |current| {
            let contribution = self
                .store
                .get_contribution(contribution_id)?
                .filter(|c| c.box_id == *box_id)
                .ok_or_else(|| LedgerError::ContributionNotFound {
                    contribution_id: contribution_id.to_string(),
                })?;

            let mut next = advance(current);
            next.count = current.count.checked_sub(1).unwrap_or_else(|| {
                tracing::warn!(box_id = %box_id, "Box count already zero, clamping");
                0
            });

            let mut total = current.total_value - contribution.canonical_value;
            if total < Decimal::ZERO {
                tracing::warn!(
                    box_id = %box_id,
                    total_value = %current.total_value,
                    canonical_value = %contribution.canonical_value,
                    "Box total would go negative, clamping to zero"
                );
                total = Decimal::ZERO;
            }
            if next.count == 0 && !total.is_zero() {
                tracing::warn!(box_id = %box_id, residual = %total, "Box emptied with residual total, forcing zero");
                total = Decimal::ZERO;
            }
            next.total_value = total;

            let mut batch = WriteSet::new();
            batch
                .delete_contribution(contribution.id, *box_id)
                .put_box(next.clone(), Precondition::Version(current.version));
            Ok((batch, next))
        })?;

        tracing::info!(
            box_id = %box_id,
            sadaqah_id = %contribution_id,
            total_value = %updated_box.total_value,
            count = updated_box.count,
            "Contribution removed"
        );

        Ok(RemoveOutcome { updated_box })
    }

    /// Empty a box into a collection snapshot.
    ///
    /// Collecting an empty box succeeds with a zero-valued collection.
    ///
    /// # Errors
    ///
    /// - `BoxNotFound` if the box does not exist
    /// - `WriteConflict` when retries run out
    pub fn collect(&self, box_id: &BoxId) -> Result<CollectOutcome> {
        let (collection, reset_box) = self.transition(box_id, "collect", |current| {
            let contributions = self.store.list_contributions_by_box(box_id)?;
            let collection = Collection::snapshot(current, &contributions);

            let mut reset = advance(current);
            reset.count = 0;
            reset.total_value = Decimal::ZERO;
            reset.currency_id = None;

            let mut batch = WriteSet::new();
            batch.put_collection(collection.clone());
            for contribution in &contributions {
                batch.delete_contribution(contribution.id, *box_id);
            }
            batch.put_box(reset.clone(), Precondition::Version(current.version));
            Ok((batch, (collection, reset)))
        })?;

        tracing::info!(
            box_id = %box_id,
            collection_id = %collection.id,
            total_value = %collection.total_value,
            contribution_count = collection.contribution_count,
            "Box collected"
        );

        Ok(CollectOutcome {
            collection,
            reset_box,
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a box.
    ///
    /// # Errors
    ///
    /// Returns `BoxNotFound` if the box does not exist.
    pub fn get_box(&self, box_id: &BoxId) -> Result<SadaqahBox> {
        self.store
            .get_box(box_id)?
            .ok_or_else(|| LedgerError::BoxNotFound {
                box_id: box_id.to_string(),
            })
    }

    /// Live contributions of a box, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BoxNotFound` if the box does not exist.
    pub fn list_contributions(&self, box_id: &BoxId) -> Result<Vec<Sadaqah>> {
        self.get_box(box_id)?;
        Ok(self.store.list_contributions_by_box(box_id)?)
    }

    /// Collection history of a box, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BoxNotFound` if the box does not exist.
    pub fn list_collections(&self, box_id: &BoxId) -> Result<Vec<Collection>> {
        self.get_box(box_id)?;
        Ok(self.store.list_collections_by_box(box_id)?)
    }

    /// Get a collection snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the collection does not exist.
    pub fn get_collection(&self, collection_id: &CollectionId) -> Result<Collection> {
        self.store
            .get_collection(collection_id)?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "collection",
                id: collection_id.to_string(),
            })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Value `amount` of `source` in the canonical currency, honouring the
    /// configured missing-rate policy.
    fn canonical_value(&self, amount: Decimal, source: &Currency) -> Result<Decimal> {
        let code = &self.config.canonical_currency;
        let converted = match self.reference.currency_by_code(code)? {
            Some(canonical) => to_canonical(amount, source, &canonical).map_err(LedgerError::from),
            None => Err(LedgerError::ConversionUnavailable {
                currency: code.clone(),
            }),
        };

        match (converted, self.config.missing_rate_policy) {
            (Ok(value), MissingRatePolicy::FailClosed) if value.is_zero() => {
                tracing::warn!(
                    currency = %source.code,
                    amount = %amount,
                    canonical_currency = %code,
                    "Canonical value rounds to zero, rejecting"
                );
                Err(LedgerError::InvalidAmount(format!(
                    "{amount} {} is too small to register in {code}",
                    source.code
                )))
            }
            (Ok(value), _) => Ok(value),
            (Err(err @ LedgerError::ConversionUnavailable { .. }), MissingRatePolicy::ZeroContribution) => {
                tracing::warn!(
                    currency = %source.code,
                    error = %err,
                    "No usable rate, recording zero canonical value"
                );
                Ok(Decimal::ZERO)
            }
            (Err(err), _) => {
                tracing::warn!(currency = %source.code, error = %err, "Conversion rejected");
                Err(err)
            }
        }
    }

    /// Run a read-compute-commit cycle until the commit lands.
    ///
    /// `plan` receives the freshly read box and returns the writes plus the
    /// value to hand back once they are applied.
    fn transition<T>(
        &self,
        box_id: &BoxId,
        action: &'static str,
        mut plan: impl FnMut(&SadaqahBox) -> Result<(WriteSet, T)>,
    ) -> Result<T> {
        let attempts = self.config.max_commit_attempts.max(1);

        for attempt in 1..=attempts {
            let current = self.get_box(box_id)?;
            let (batch, outcome) = plan(&current)?;

            match self.store.commit(batch) {
                Ok(()) => return Ok(outcome),
                Err(err) if err.is_conflict() => {
                    tracing::warn!(
                        box_id = %box_id,
                        action,
                        attempt,
                        version = current.version,
                        "Box changed during commit, retrying"
                    );
                }
                Err(err) => {
                    tracing::error!(box_id = %box_id, action, error = %err, "Commit failed");
                    return Err(err.into());
                }
            }
        }

        tracing::error!(box_id = %box_id, action, attempts, "Giving up after repeated conflicts");
        Err(LedgerError::WriteConflict {
            box_id: box_id.to_string(),
        })
    }
}

/// Copy of `current` at the next version.
fn advance(current: &SadaqahBox) -> SadaqahBox {
    let mut next = current.clone();
    next.version = current.version + 1;
    next.updated_at = Utc::now();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sadaqah_store::MemoryStore;

    fn ledger() -> (Ledger, Arc<ReferenceData>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = LedgerConfig::default();
        let reference = Arc::new(ReferenceData::new(store.clone(), &config));
        (Ledger::new(store, reference.clone(), config), reference)
    }

    #[test]
    fn rejects_non_positive_amount() {
        let (ledger, _) = ledger();
        let sadaqah_box = ledger.create_box(UserId::generate(), "Zero", None).unwrap();

        for amount in [dec!(0), dec!(-1)] {
            let request =
                AddContribution::new(sadaqah_box.id, amount, CurrencyId::generate(), UserId::generate());
            assert!(matches!(
                ledger.add_contribution(request),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_repeat_count() {
        let (ledger, _) = ledger();
        let sadaqah_box = ledger.create_box(UserId::generate(), "Zero", None).unwrap();
        let request = AddContribution::new(
            sadaqah_box.id,
            dec!(1),
            CurrencyId::generate(),
            UserId::generate(),
        )
        .repeated(0);

        assert!(matches!(
            ledger.add_contribution(request),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn unknown_currency_is_reported() {
        let (ledger, _) = ledger();
        let sadaqah_box = ledger.create_box(UserId::generate(), "Box", None).unwrap();
        let request = AddContribution::new(
            sadaqah_box.id,
            dec!(1),
            CurrencyId::generate(),
            UserId::generate(),
        );

        assert!(matches!(
            ledger.add_contribution(request),
            Err(LedgerError::CurrencyNotFound { .. })
        ));
    }

    #[test]
    fn missing_canonical_currency_fails_closed() {
        let (ledger, reference) = ledger();
        let usd = Currency::new("USD", "US Dollar", Some(dec!(1)));
        reference.create_currency(&usd).unwrap();
        let sadaqah_box = ledger.create_box(UserId::generate(), "Box", None).unwrap();

        let err = ledger
            .add_contribution(AddContribution::new(
                sadaqah_box.id,
                dec!(10),
                usd.id,
                UserId::generate(),
            ))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConversionUnavailable { currency } if currency == "XAU"));
    }

    #[test]
    fn advance_bumps_version() {
        let sadaqah_box = SadaqahBox::new(UserId::generate(), "Box");
        let next = advance(&sadaqah_box);
        assert_eq!(next.version, sadaqah_box.version + 1);
        assert!(next.updated_at >= sadaqah_box.updated_at);
    }
}
