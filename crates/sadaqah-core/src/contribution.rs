//! Contribution ("sadaqah") and collection records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BoxId, CollectionId, CurrencyId, SadaqahBox, SadaqahId, UserId};

/// A single deposit into a box.
///
/// Contributions are immutable. `value` is stored exactly as entered in its own
/// currency; `canonical_value` is the delta that was applied to the box total
/// when the row was written, so removing it undoes exactly that delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sadaqah {
    /// Contribution ID (ULID, time-ordered).
    pub id: SadaqahId,

    /// The box this contribution sits in.
    pub box_id: BoxId,

    /// Amount in `currency_id`, as entered.
    pub value: Decimal,

    /// Currency of `value`.
    pub currency_id: CurrencyId,

    /// Canonical-unit delta applied to the box when this row was added.
    pub canonical_value: Decimal,

    /// Number of identical deposits folded into this row.
    ///
    /// A batch add stores one row whose `value` is the per-unit amount times
    /// this count. The box `count` still grows by one.
    pub repeat_count: u32,

    /// Who deposited it.
    pub owner_id: UserId,

    /// When it was deposited.
    pub created_at: DateTime<Utc>,
}

/// An amount tagged with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    /// Currency of `value`.
    pub currency_id: CurrencyId,
    /// Raw amount in that currency.
    pub value: Decimal,
}

/// Immutable snapshot written when a box is emptied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection ID (ULID, time-ordered).
    pub id: CollectionId,

    /// The box that was emptied.
    pub box_id: BoxId,

    /// When the box was emptied.
    pub emptied_at: DateTime<Utc>,

    /// Box total at collection time, in the canonical unit.
    pub total_value: Decimal,

    /// Box display currency at collection time.
    pub currency_id: Option<CurrencyId>,

    /// Box contribution count at collection time.
    pub contribution_count: u64,

    /// Raw per-currency sums of the collected contributions.
    #[serde(default)]
    pub breakdown: Vec<CurrencyAmount>,
}

impl Collection {
    /// Snapshot a box and the contributions being removed from it.
    #[must_use]
    pub fn snapshot(sadaqah_box: &SadaqahBox, contributions: &[Sadaqah]) -> Self {
        Self {
            id: CollectionId::generate(),
            box_id: sadaqah_box.id,
            emptied_at: Utc::now(),
            total_value: sadaqah_box.total_value,
            currency_id: sadaqah_box.currency_id,
            contribution_count: sadaqah_box.count,
            breakdown: breakdown(contributions),
        }
    }
}

/// Sum raw contribution values per currency, ordered by currency ID.
#[must_use]
pub fn breakdown(contributions: &[Sadaqah]) -> Vec<CurrencyAmount> {
    let mut sums: BTreeMap<CurrencyId, Decimal> = BTreeMap::new();
    for contribution in contributions {
        *sums.entry(contribution.currency_id).or_default() += contribution.value;
    }
    sums.into_iter()
        .map(|(currency_id, value)| CurrencyAmount { currency_id, value })
        .collect()
}
