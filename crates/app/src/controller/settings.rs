//! Controller Settings

use std::time::Duration;

use jiff::SignedDuration;
use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{self, Currency},
};

use lieferspatz::pricing::{PricingError, to_money};

/// Policy knobs for [`CartController`](super::CartController).
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Flat fee added to every order
    pub delivery_fee: Decimal,

    /// Currency prices are quoted in
    pub currency: &'static Currency,

    /// How long an emptied, open panel stays visible before closing
    pub auto_close_grace: Duration,

    /// Age after which opening the panel reloads the lines
    pub stale_after: SignedDuration,

    /// Whether a confirmed addition opens the panel
    pub open_on_add: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            delivery_fee: Decimal::new(299, 2),
            currency: iso::EUR,
            auto_close_grace: Duration::from_millis(1500),
            stale_after: SignedDuration::from_secs(30),
            open_on_add: true,
        }
    }
}

impl ControllerSettings {
    /// The delivery fee as money.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the fee does not fit into minor units.
    pub fn delivery_fee(&self) -> Result<Money<'static, Currency>, PricingError> {
        to_money(self.delivery_fee, self.currency)
    }
}
