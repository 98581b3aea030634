//! Pending optimistic operations.

use smallvec::SmallVec;

use crate::items::ItemId;

/// Kind of user action an optimistic delta stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Units added to the cart
    Add,

    /// A line removed from the cart
    Remove,

    /// A line's quantity set to a new value
    UpdateQuantity,
}

/// Handle identifying one pending operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    /// Wrap a raw ticket number. Numbers must be unique per cart.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// An optimistic delta waiting for the storefront to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperation {
    /// Handle used to settle this operation
    pub ticket: Ticket,

    /// Action the delta stands for
    pub kind: OperationKind,

    /// Item affected
    pub item_id: ItemId,

    /// Change in visible units
    pub delta_quantity: i64,
}

/// Outstanding optimistic operations, in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingLedger {
    operations: SmallVec<[PendingOperation; 4]>,
}

impl PendingLedger {
    /// Record a new optimistic delta.
    pub fn record(&mut self, operation: PendingOperation) {
        self.operations.push(operation);
    }

    /// Remove the operation with the given ticket, returning it.
    ///
    /// Used for both confirmation and rollback: either way the delta stops
    /// contributing to the visible count.
    pub fn settle(&mut self, ticket: Ticket) -> Option<PendingOperation> {
        let position = self
            .operations
            .iter()
            .position(|operation| operation.ticket == ticket)?;

        Some(self.operations.remove(position))
    }

    /// Sum of all outstanding deltas.
    pub fn net_delta(&self) -> i64 {
        self.operations
            .iter()
            .map(|operation| operation.delta_quantity)
            .sum()
    }

    /// Sum of the outstanding deltas for one item.
    pub fn delta_for(&self, item_id: ItemId) -> i64 {
        self.operations
            .iter()
            .filter(|operation| operation.item_id == item_id)
            .map(|operation| operation.delta_quantity)
            .sum()
    }

    /// Whether any outstanding operation is an addition.
    pub fn has_additions(&self) -> bool {
        self.operations
            .iter()
            .any(|operation| operation.delta_quantity > 0)
    }

    /// Iterate outstanding operations.
    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.operations.iter()
    }

    /// Number of outstanding operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
