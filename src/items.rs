//! Items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::TypedId;

/// Marker for restaurant ids.
#[derive(Debug)]
pub enum Restaurant {}

/// Menu item id, as used by the `/cart/add/{id}` and `/cart/remove/{id}` routes.
pub type ItemId = TypedId<CartItem>;

/// Restaurant id.
pub type RestaurantId = TypedId<Restaurant>;

/// A line in the cart, as confirmed by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Menu item id
    pub id: ItemId,

    /// Display name
    pub name: String,

    /// Price of a single unit
    #[serde(rename = "price")]
    pub unit_price: Decimal,

    /// Number of units, at least one
    pub quantity: u32,

    /// Restaurant the item is ordered from
    pub restaurant_id: RestaurantId,

    /// Restaurant display name
    pub restaurant_name: String,
}

impl CartItem {
    /// Creates a cart line for the given menu item.
    #[must_use]
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
        restaurant_id: RestaurantId,
        restaurant_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            quantity,
            restaurant_id,
            restaurant_name: restaurant_name.into(),
        }
    }
}

/// Total number of units across the given lines.
pub fn total_quantity(items: &[CartItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}
