//! Cart events and the notices shown for them.

use lieferspatz::{errors::CartError, items::ItemId, panel::PanelState};

/// Action a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    /// Fetching the lines
    Load,

    /// Adding units
    Add,

    /// Removing a line
    Remove,

    /// Changing a line's quantity
    UpdateQuantity,

    /// Comparing the count with the storefront
    Sync,
}

impl CartAction {
    fn failure_text(self) -> &'static str {
        match self {
            Self::Load | Self::Sync => "Could not load your cart. Please try again.",
            Self::Add => "Failed to add item to cart. Please try again.",
            Self::Remove => "Failed to remove item from cart. Please try again.",
            Self::UpdateQuantity => "Failed to update the quantity. Please try again.",
        }
    }
}

/// One-shot notification published by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The storefront confirmed an addition.
    ItemAdded {
        /// Item added
        item_id: ItemId,

        /// Units added
        quantity: u32,
    },

    /// The storefront removed a line.
    ItemRemoved {
        /// Item removed
        item_id: ItemId,
    },

    /// The storefront confirmed a new quantity.
    QuantityChanged {
        /// Item updated
        item_id: ItemId,

        /// New quantity
        quantity: u32,
    },

    /// The panel moved between states.
    PanelMoved {
        /// State before
        from: PanelState,

        /// State after
        to: PanelState,
    },

    /// An action failed; the cart is unchanged.
    Failed {
        /// What was attempted
        action: CartAction,

        /// Why it failed
        error: CartError,
    },
}

/// How prominently a notice is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Confirmation
    Success,

    /// Neutral information
    Info,

    /// Something went wrong
    Error,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,

    /// Text to show
    pub text: String,

    /// Whether the UI should offer a way to sign in again
    pub requires_login: bool,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            requires_login: false,
        }
    }
}

impl CartEvent {
    /// Notice to show for this event, if any.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::ItemAdded { .. } => Some(Notice::new(NoticeLevel::Success, "Item added to cart!")),
            Self::ItemRemoved { .. } => Some(Notice::new(NoticeLevel::Info, "Item removed from cart")),
            Self::QuantityChanged { .. } | Self::PanelMoved { .. } => None,
            Self::Failed { action, error } => {
                let text = match error {
                    CartError::ServerRejected { message: None, .. }
                    | CartError::UnexpectedResponse(_) => action.failure_text().to_string(),
                    other => other.user_message(),
                };

                Some(Notice {
                    level: NoticeLevel::Error,
                    text,
                    requires_login: error.requires_login(),
                })
            }
        }
    }
}
