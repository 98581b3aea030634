//! Cart State

use jiff::{SignedDuration, Timestamp};

use crate::{
    errors::CartError,
    items::{CartItem, ItemId, total_quantity},
    panel::{PanelState, Transition},
    pending::{OperationKind, PendingLedger, PendingOperation, Ticket},
};

/// Everything the UI renders about the cart.
///
/// Confirmed lines and optimistic deltas are kept apart: `items` only ever
/// holds what the storefront confirmed, while `pending` overlays the deltas
/// still waiting for an answer. Rolling back therefore means dropping one
/// ledger entry, never re-deriving the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartItem>,
    pending: PendingLedger,
    panel: PanelState,
    is_loading: bool,
    last_synced_at: Option<Timestamp>,
    last_error: Option<CartError>,
}

impl CartState {
    /// Confirmed lines, in server order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The confirmed line for an item.
    pub fn item(&self, item_id: ItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Outstanding optimistic operations.
    pub fn pending(&self) -> &PendingLedger {
        &self.pending
    }

    /// Panel visibility.
    pub fn panel(&self) -> PanelState {
        self.panel
    }

    /// Whether the panel is shown or opening.
    pub fn is_open(&self) -> bool {
        self.panel.is_open()
    }

    /// Whether a load is outstanding.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// When the lines were last replaced from the storefront.
    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.last_synced_at
    }

    /// The most recent failure, cleared by the next successful load.
    pub fn last_error(&self) -> Option<&CartError> {
        self.last_error.as_ref()
    }

    /// Units confirmed by the storefront.
    pub fn confirmed_count(&self) -> u32 {
        u32::try_from(total_quantity(&self.items)).unwrap_or(u32::MAX)
    }

    /// Units shown in the header bubble: confirmed units plus optimistic
    /// deltas, never below zero.
    pub fn count(&self) -> u32 {
        let visible = i64::from(self.confirmed_count()).saturating_add(self.pending.net_delta());

        u32::try_from(visible.max(0)).unwrap_or(u32::MAX)
    }

    /// Whether the cart shows nothing, confirmed or optimistic.
    pub fn is_empty(&self) -> bool {
        self.count() == 0 && !self.pending.has_additions()
    }

    /// Whether the lines should be fetched again before showing them.
    pub fn is_stale(&self, now: Timestamp, max_age: SignedDuration) -> bool {
        self.last_synced_at
            .is_none_or(|synced_at| now.duration_since(synced_at) > max_age)
    }

    /// Adopt the storefront's lines wholesale.
    pub fn replace_items(&mut self, items: Vec<CartItem>, synced_at: Timestamp) {
        self.items = items;
        self.last_synced_at = Some(synced_at);
        self.last_error = None;
    }

    /// Mark a load as started or finished.
    pub fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    /// Remember a failure for the UI's retry affordance.
    pub fn record_error(&mut self, error: CartError) {
        self.last_error = Some(error);
    }

    /// Apply an optimistic delta.
    pub fn begin(&mut self, ticket: Ticket, kind: OperationKind, item_id: ItemId, delta: i64) {
        self.pending.record(PendingOperation {
            ticket,
            kind,
            item_id,
            delta_quantity: delta,
        });
    }

    /// Revert an optimistic delta exactly.
    pub fn rollback(&mut self, ticket: Ticket) -> Option<PendingOperation> {
        self.pending.settle(ticket)
    }

    /// The storefront accepted an addition.
    ///
    /// Returns `false` when the item has no confirmed line yet; its details
    /// (name, price, restaurant) are only known after the next load.
    pub fn confirm_add(&mut self, ticket: Ticket, item_id: ItemId, quantity: u32) -> bool {
        self.pending.settle(ticket);

        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                true
            }
            None => false,
        }
    }

    /// The storefront removed a line. Removal is whole-item.
    pub fn confirm_remove(&mut self, ticket: Option<Ticket>, item_id: ItemId) -> Option<CartItem> {
        if let Some(ticket) = ticket {
            self.pending.settle(ticket);
        }

        let position = self.items.iter().position(|item| item.id == item_id)?;

        Some(self.items.remove(position))
    }

    /// The storefront accepted a new quantity for a line.
    pub fn confirm_quantity(&mut self, ticket: Ticket, item_id: ItemId, quantity: u32) -> bool {
        self.pending.settle(ticket);

        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Request the panel to open.
    pub fn open_panel(&mut self) -> Transition {
        self.apply(self.panel.open())
    }

    /// Request the panel to close.
    pub fn close_panel(&mut self) -> Transition {
        self.apply(self.panel.close())
    }

    /// Signal that the panel animation finished.
    pub fn finish_panel_transition(&mut self) -> Transition {
        self.apply(self.panel.finish())
    }

    fn apply(&mut self, transition: Transition) -> Transition {
        self.panel = transition.state();

        transition
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::items::RestaurantId;

    use super::*;

    fn pizza(quantity: u32) -> CartItem {
        CartItem::new(
            ItemId::new(1),
            "Pizza",
            Decimal::new(850, 2),
            quantity,
            RestaurantId::new(1),
            "Luigi's",
        )
    }

    fn loaded(items: Vec<CartItem>) -> CartState {
        let mut state = CartState::default();

        state.replace_items(items, Timestamp::UNIX_EPOCH);

        state
    }

    #[test]
    fn count_overlays_pending_deltas() {
        let mut state = loaded(vec![pizza(2)]);

        state.begin(Ticket::new(1), OperationKind::Add, ItemId::new(42), 1);

        assert_eq!(state.confirmed_count(), 2);
        assert_eq!(state.count(), 3);
    }

    #[test]
    fn rollback_restores_the_previous_count() {
        let mut state = loaded(vec![pizza(2)]);
        let before = state.count();

        state.begin(Ticket::new(1), OperationKind::Add, ItemId::new(42), 1);
        state.rollback(Ticket::new(1));

        assert_eq!(state.count(), before);
        assert!(state.pending().is_empty());
    }

    #[test]
    fn count_is_clamped_at_zero() {
        let mut state = CartState::default();

        state.begin(Ticket::new(1), OperationKind::Remove, ItemId::new(1), -1);

        assert_eq!(state.count(), 0);
    }

    #[test]
    fn confirm_add_increments_known_lines_only() {
        let mut state = loaded(vec![pizza(2)]);

        state.begin(Ticket::new(1), OperationKind::Add, ItemId::new(1), 1);

        assert!(state.confirm_add(Ticket::new(1), ItemId::new(1), 1));
        assert_eq!(state.item(ItemId::new(1)).map(|item| item.quantity), Some(3));

        state.begin(Ticket::new(2), OperationKind::Add, ItemId::new(9), 1);

        assert!(!state.confirm_add(Ticket::new(2), ItemId::new(9), 1));
        assert_eq!(state.count(), 3);
    }

    #[test]
    fn confirm_remove_drops_the_whole_line() {
        let mut state = loaded(vec![pizza(2)]);

        state.begin(Ticket::new(1), OperationKind::Remove, ItemId::new(1), -1);

        assert_eq!(state.count(), 1);

        let removed = state.confirm_remove(Some(Ticket::new(1)), ItemId::new(1));

        assert_eq!(removed.map(|item| item.quantity), Some(2));
        assert!(state.items().is_empty());
        assert_eq!(state.count(), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn replacing_items_clears_the_last_error() {
        let mut state = CartState::default();

        state.record_error(CartError::SessionExpired);
        state.replace_items(vec![pizza(1)], Timestamp::UNIX_EPOCH);

        assert_eq!(state.last_error(), None);
        assert_eq!(state.last_synced_at(), Some(Timestamp::UNIX_EPOCH));
    }

    #[test]
    fn staleness_follows_last_sync() {
        let never_synced = CartState::default();
        let synced = loaded(vec![]);
        let max_age = SignedDuration::from_secs(30);

        assert!(never_synced.is_stale(Timestamp::UNIX_EPOCH, max_age));
        assert!(!synced.is_stale(
            Timestamp::UNIX_EPOCH + SignedDuration::from_secs(10),
            max_age
        ));
        assert!(synced.is_stale(
            Timestamp::UNIX_EPOCH + SignedDuration::from_secs(31),
            max_age
        ));
    }

    #[test]
    fn panel_requests_update_state() {
        let mut state = CartState::default();

        assert!(state.open_panel().changed());
        assert!(state.is_open());
        assert!(!state.open_panel().changed());
        assert!(state.finish_panel_transition().changed());
        assert_eq!(state.panel(), PanelState::Open);
        assert!(state.close_panel().changed());
        assert!(!state.is_open());
    }
}
