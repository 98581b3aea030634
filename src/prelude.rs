//! Lieferspatz prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    errors::CartError,
    ids::TypedId,
    items::{CartItem, ItemId, Restaurant, RestaurantId},
    panel::{DismissTrigger, PanelState, Transition},
    payloads::{AddItemRequest, CartPayload, CountPayload, MutationAck},
    pending::{OperationKind, PendingLedger, PendingOperation, Ticket},
    pricing::PricingError,
    receipt::{CartSummary, ReceiptError, RestaurantGroup, SummaryLine},
    state::CartState,
};
