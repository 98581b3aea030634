//! Storefront cart routes.

use async_trait::async_trait;
use mockall::automock;

use lieferspatz::{
    errors::CartError,
    items::ItemId,
    payloads::{CartPayload, MutationAck},
};

pub use http::{HttpCartApi, HttpCartApiConfig, HttpCartApiError};

mod http;

/// Remote cart used by the controller.
///
/// Implementations map every failure onto [`CartError`]; the controller never
/// sees transport types.
#[automock]
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`
    async fn fetch_cart(&self) -> Result<CartPayload, CartError>;

    /// `GET /cart/count`
    async fn fetch_count(&self) -> Result<u32, CartError>;

    /// `POST /cart/add/{item_id}` with `{ quantity }`
    async fn add_item(&self, item_id: ItemId, quantity: u32) -> Result<MutationAck, CartError>;

    /// `POST /cart/remove/{item_id}`
    async fn remove_item(&self, item_id: ItemId) -> Result<MutationAck, CartError>;
}
