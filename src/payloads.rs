//! Wire payloads exchanged with the storefront's cart routes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::CartError, items::CartItem};

/// `GET /cart` response body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartPayload {
    /// Cart lines in server order
    #[serde(default)]
    pub items: Vec<CartItem>,

    /// Server-computed total, informational only
    #[serde(default)]
    pub total_price: Decimal,
}

impl CartPayload {
    /// Validate the payload and return the lines to adopt.
    ///
    /// Lines with a zero quantity carry nothing to show and are dropped; the
    /// remaining lines keep the server order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnexpectedResponse`] when a line has a negative price.
    pub fn into_items(self) -> Result<Vec<CartItem>, CartError> {
        if let Some(item) = self.items.iter().find(|item| item.unit_price.is_sign_negative()) {
            return Err(CartError::UnexpectedResponse(format!(
                "item {} has a negative price",
                item.id
            )));
        }

        Ok(self
            .items
            .into_iter()
            .filter(|item| item.quantity > 0)
            .collect())
    }
}

/// `GET /cart/count` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountPayload {
    /// Units in the cart
    #[serde(default)]
    pub count: u32,
}

/// `POST /cart/add/{id}` request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemRequest {
    /// Units to add, at least one
    pub quantity: u32,
}

/// Body returned by the mutating routes.
///
/// Every field is optional: older storefront handlers answer with an empty
/// object, newer ones report `success` and the updated `count`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationAck {
    /// Explicit outcome flag
    #[serde(default)]
    pub success: Option<bool>,

    /// Human-readable message
    #[serde(default, alias = "error")]
    pub message: Option<String>,

    /// Units in the cart after the mutation
    #[serde(default)]
    pub count: Option<u32>,
}

impl MutationAck {
    /// Whether the storefront explicitly refused the mutation.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}
