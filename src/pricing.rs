//! Prices

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::items::{CartItem, ItemId};

/// Errors that can occur while pricing a cart.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// An amount does not fit into minor units of the currency.
    #[error("amount {0} cannot be represented in minor units")]
    OutOfRange(Decimal),

    /// A line total overflowed.
    #[error("line total for item {0} overflows")]
    LineOverflow(ItemId),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Converts a decimal amount into money, rounding to the currency's minor unit.
///
/// # Errors
///
/// - [`PricingError::OutOfRange`]: the amount does not fit into `i64` minor units.
pub fn to_money(
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let minor = to_minor_units(amount, currency)?;

    Ok(Money::from_minor(minor, currency))
}

fn to_minor_units(amount: Decimal, currency: &Currency) -> Result<i64, PricingError> {
    let scale = Decimal::from(10_i64.pow(currency.exponent));

    amount
        .checked_mul(scale)
        .map(|scaled| scaled.round_dp(0))
        .and_then(|scaled| scaled.to_i64())
        .ok_or(PricingError::OutOfRange(amount))
}

/// Price of a single line: unit price times quantity.
///
/// # Errors
///
/// - [`PricingError::OutOfRange`]: the unit price cannot be converted.
/// - [`PricingError::LineOverflow`]: the multiplication overflows.
pub fn line_total(
    item: &CartItem,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    let unit = to_minor_units(item.unit_price, currency)?;

    let total = unit
        .checked_mul(i64::from(item.quantity))
        .ok_or(PricingError::LineOverflow(item.id))?;

    Ok(Money::from_minor(total, currency))
}

/// Sum of all line totals. An empty cart costs nothing.
///
/// # Errors
///
/// Returns a [`PricingError`] if a line cannot be priced or the sum fails.
pub fn subtotal(
    items: &[CartItem],
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, PricingError> {
    items
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, item| {
            Ok(acc.add(line_total(item, currency)?)?)
        })
}

/// Subtotal plus the delivery fee.
///
/// # Errors
///
/// Returns a [`PricingError`] if the subtotal fails or the fee is in another currency.
pub fn total(
    items: &[CartItem],
    delivery_fee: Money<'static, Currency>,
) -> Result<Money<'static, Currency>, PricingError> {
    let subtotal = subtotal(items, delivery_fee.currency())?;

    Ok(subtotal.add(delivery_fee)?)
}
