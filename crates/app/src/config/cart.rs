//! Cart Policy Config

use std::time::Duration;

use clap::{ArgAction, Args};
use jiff::SignedDuration;
use rust_decimal::Decimal;

use crate::controller::ControllerSettings;

/// Cart behaviour settings.
#[derive(Debug, Args)]
pub struct CartPolicyConfig {
    /// Flat delivery fee added to every order
    #[arg(long, env = "LIEFERSPATZ_DELIVERY_FEE", default_value = "2.99", value_parser = non_negative_amount)]
    pub delivery_fee: Decimal,

    /// Delay before an emptied, open panel closes, in milliseconds
    #[arg(long, env = "LIEFERSPATZ_AUTO_CLOSE_GRACE_MS", default_value_t = 1_500_u64)]
    pub auto_close_grace_ms: u64,

    /// Age in seconds after which opening the panel reloads the cart
    #[arg(long, env = "LIEFERSPATZ_STALE_AFTER_SECS", default_value_t = 30_u32)]
    pub stale_after_secs: u32,

    /// Open the panel when an item is added
    #[arg(long, env = "LIEFERSPATZ_OPEN_ON_ADD", default_value_t = true, action = ArgAction::Set)]
    pub open_on_add: bool,
}

impl CartPolicyConfig {
    /// Controller settings for this policy.
    #[must_use]
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            delivery_fee: self.delivery_fee,
            auto_close_grace: Duration::from_millis(self.auto_close_grace_ms),
            stale_after: SignedDuration::from_secs(i64::from(self.stale_after_secs)),
            open_on_add: self.open_on_add,
            ..ControllerSettings::default()
        }
    }
}

fn non_negative_amount(raw: &str) -> Result<Decimal, String> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .map_err(|source| format!("invalid amount {raw:?}: {source}"))?;

    if amount.is_sign_negative() {
        return Err(format!("amount must not be negative, got {amount}"));
    }

    Ok(amount)
}
