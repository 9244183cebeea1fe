//! Sadaqah boxes and their running aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BoxId, CurrencyId, UserId};

/// A donation box.
///
/// `count`, `total_value` and `currency_id` form the running aggregate. Only
/// the ledger changes them, and every change bumps `version` so concurrent
/// writers can detect each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SadaqahBox {
    /// Box ID.
    pub id: BoxId,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// The user who owns the box.
    pub owner_id: UserId,

    /// Number of live contribution rows.
    pub count: u64,

    /// Running total in the canonical unit.
    pub total_value: Decimal,

    /// Currency of the first contribution since the last collection.
    ///
    /// Display only; it does not restrict later contributions.
    pub currency_id: Option<CurrencyId>,

    /// Optimistic concurrency token, incremented on every aggregate write.
    pub version: u64,

    /// When the box was created.
    pub created_at: DateTime<Utc>,

    /// When the box was last written.
    pub updated_at: DateTime<Utc>,
}

impl SadaqahBox {
    /// Create an empty box.
    #[must_use]
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BoxId::generate(),
            name: name.into(),
            description: None,
            owner_id,
            count: 0,
            total_value: Decimal::ZERO,
            currency_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the box currently holds no contributions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The aggregate as exposed to callers.
    #[must_use]
    pub fn summary(&self) -> BoxSummary {
        BoxSummary {
            id: self.id,
            count: self.count,
            total_value: self.total_value,
            currency_id: self.currency_id,
        }
    }
}

/// The externally visible aggregate of a box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSummary {
    /// Box ID.
    pub id: BoxId,
    /// Number of live contributions.
    pub count: u64,
    /// Running total in the canonical unit.
    pub total_value: Decimal,
    /// Display currency.
    pub currency_id: Option<CurrencyId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_box_is_empty() {
        let sadaqah_box = SadaqahBox::new(UserId::generate(), "Ramadan");
        assert!(sadaqah_box.is_empty());
        assert_eq!(sadaqah_box.total_value, Decimal::ZERO);
        assert!(sadaqah_box.currency_id.is_none());
        assert_eq!(sadaqah_box.version, 0);
    }

    #[test]
    fn summary_mirrors_aggregate() {
        let mut sadaqah_box = SadaqahBox::new(UserId::generate(), "Masjid");
        sadaqah_box.count = 3;
        sadaqah_box.total_value = Decimal::new(15, 3);

        let summary = sadaqah_box.summary();
        assert_eq!(summary.id, sadaqah_box.id);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_value, Decimal::new(15, 3));
    }
}
