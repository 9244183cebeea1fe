//! Atomic batch writer.
//!
//! A `WriteSet` stages every row a ledger transition touches. `Store::commit`
//! checks all preconditions and then applies the whole set or none of it, so
//! readers never see a contribution without its box update (or a collection
//! without the matching reset).

use sadaqah_core::{BoxId, Collection, Sadaqah, SadaqahBox, SadaqahId};

/// Condition a stored box must satisfy for a staged box write to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No box with this ID may exist yet.
    Absent,

    /// The stored box must be at exactly this version.
    Version(u64),
}

/// One staged write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or replace a box record.
    PutBox {
        /// The new record.
        record: SadaqahBox,
        /// Guard on the currently stored record.
        expect: Precondition,
    },

    /// Insert a contribution and its box index entry.
    PutContribution(Sadaqah),

    /// Delete a contribution and its box index entry.
    ///
    /// The contribution must exist and belong to `box_id`.
    DeleteContribution {
        /// Contribution to delete.
        id: SadaqahId,
        /// Box the contribution belongs to.
        box_id: BoxId,
    },

    /// Insert a collection snapshot and its box index entry.
    PutCollection(Collection),
}

/// An ordered set of writes applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    ops: Vec<WriteOp>,
}

impl WriteSet {
    /// Create an empty write set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a box write guarded by `expect`.
    pub fn put_box(&mut self, record: SadaqahBox, expect: Precondition) -> &mut Self {
        self.ops.push(WriteOp::PutBox { record, expect });
        self
    }

    /// Stage a contribution insert.
    pub fn put_contribution(&mut self, contribution: Sadaqah) -> &mut Self {
        self.ops.push(WriteOp::PutContribution(contribution));
        self
    }

    /// Stage a contribution delete.
    pub fn delete_contribution(&mut self, id: SadaqahId, box_id: BoxId) -> &mut Self {
        self.ops.push(WriteOp::DeleteContribution { id, box_id });
        self
    }

    /// Stage a collection insert.
    pub fn put_collection(&mut self, collection: Collection) -> &mut Self {
        self.ops.push(WriteOp::PutCollection(collection));
        self
    }

    /// Staged operations in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteSet {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Check a box precondition against the stored version.
///
/// `stored` is `None` when no box exists.
pub(crate) fn check_box(
    box_id: &BoxId,
    stored: Option<u64>,
    expect: Precondition,
) -> crate::Result<()> {
    match (expect, stored) {
        (Precondition::Absent, None) => Ok(()),
        (Precondition::Version(expected), Some(found)) if expected == found => Ok(()),
        (Precondition::Version(_), None) => Err(crate::StoreError::NotFound {
            entity: "box",
            id: box_id.to_string(),
        }),
        _ => Err(crate::StoreError::Conflict {
            entity: "box",
            id: box_id.to_string(),
        }),
    }
}
