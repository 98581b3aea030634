//! Receipt

use std::io;

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    items::{CartItem, ItemId, RestaurantId},
    pricing::{PricingError, line_total, to_money},
};

/// Errors that can occur when building or writing a cart summary.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// A line or total could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Writing the summary failed.
    #[error("failed to write cart summary")]
    Io(#[from] io::Error),
}

/// One priced line of the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    /// Menu item id
    pub item_id: ItemId,

    /// Display name
    pub name: String,

    /// Units ordered
    pub quantity: u32,

    /// Price of one unit
    pub unit_price: Money<'static, Currency>,

    /// Unit price times quantity
    pub line_total: Money<'static, Currency>,
}

/// Lines ordered from the same restaurant.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantGroup {
    /// Restaurant id
    pub restaurant_id: RestaurantId,

    /// Restaurant display name
    pub restaurant_name: String,

    /// Lines in server order
    pub lines: SmallVec<[SummaryLine; 4]>,
}

/// Priced view of a cart, grouped by restaurant.
///
/// Groups appear in the order their first line appears in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    groups: Vec<RestaurantGroup>,
    subtotal: Money<'static, Currency>,
    delivery_fee: Money<'static, Currency>,
    total: Money<'static, Currency>,
    count: u32,
}

impl CartSummary {
    /// Price the given lines.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError::Pricing`] if a line cannot be priced or the
    /// fee's currency cannot be added to the subtotal.
    pub fn new(
        items: &[CartItem],
        delivery_fee: Money<'static, Currency>,
    ) -> Result<Self, ReceiptError> {
        let currency = delivery_fee.currency();

        let mut groups: Vec<RestaurantGroup> = Vec::new();
        let mut group_index: FxHashMap<RestaurantId, usize> = FxHashMap::default();
        let mut subtotal = Money::from_minor(0, currency);
        let mut count = 0_u32;

        for item in items {
            let line = SummaryLine {
                item_id: item.id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: to_money(item.unit_price, currency)?,
                line_total: line_total(item, currency)?,
            };

            subtotal = subtotal.add(line.line_total).map_err(PricingError::from)?;
            count = count.saturating_add(item.quantity);

            let index = *group_index.entry(item.restaurant_id).or_insert_with(|| {
                groups.push(RestaurantGroup {
                    restaurant_id: item.restaurant_id,
                    restaurant_name: item.restaurant_name.clone(),
                    lines: SmallVec::new(),
                });

                groups.len() - 1
            });

            if let Some(group) = groups.get_mut(index) {
                group.lines.push(line);
            }
        }

        let total = subtotal.add(delivery_fee).map_err(PricingError::from)?;

        Ok(Self {
            groups,
            subtotal,
            delivery_fee,
            total,
            count,
        })
    }

    /// Restaurant groups in cart order.
    pub fn groups(&self) -> &[RestaurantGroup] {
        &self.groups
    }

    /// Sum of all line totals.
    pub fn subtotal(&self) -> Money<'static, Currency> {
        self.subtotal
    }

    /// Flat delivery fee.
    pub fn delivery_fee(&self) -> Money<'static, Currency> {
        self.delivery_fee
    }

    /// Subtotal plus delivery fee.
    pub fn total(&self) -> Money<'static, Currency> {
        self.total
    }

    /// Units across all lines.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether there is nothing to order.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write the summary as a table followed by the totals.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError::Io`] if writing fails.
    pub fn write_to(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        if self.is_empty() {
            writeln!(out, "\nYour cart is empty\n")?;

            return Ok(());
        }

        let mut builder = Builder::default();
        let mut group_boundary_rows: SmallVec<[usize; 8]> = SmallVec::new();
        let mut row = 1;

        builder.push_record(["Restaurant", "Item", "Qty", "Unit", "Line"]);

        for group in &self.groups {
            group_boundary_rows.push(row);

            for (position, line) in group.lines.iter().enumerate() {
                let restaurant = if position == 0 {
                    group.restaurant_name.clone()
                } else {
                    String::new()
                };

                builder.push_record([
                    restaurant,
                    line.name.clone(),
                    format!("× {}", line.quantity),
                    format!("{}", line.unit_price),
                    format!("{}", line.line_total),
                ]);

                row += 1;
            }
        }

        write_table(out, builder, &group_boundary_rows)?;
        write_totals(out, self)?;

        Ok(())
    }
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    group_boundary_rows: &[usize],
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();

    for &row in group_boundary_rows {
        theme.insert_horizontal_line(row, separator);
    }

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    writeln!(out, "\n{}", dim_borders(&table.to_string()))?;

    Ok(())
}

fn write_totals(out: &mut impl io::Write, summary: &CartSummary) -> Result<(), ReceiptError> {
    let rows = [
        (" Subtotal:", format!("{}", summary.subtotal())),
        (" Delivery Fee:", format!("{}", summary.delivery_fee())),
        (" \x1b[1mTotal:\x1b[0m", format!("\x1b[1m{}\x1b[0m", summary.total())),
    ];

    let label_width = rows
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or_default();

    let value_width = rows
        .iter()
        .map(|(_, value)| display_width(value))
        .max()
        .unwrap_or_default();

    for (label, value) in &rows {
        let label_pad = label_width.saturating_sub(display_width(label));
        let value_pad = value_width.saturating_sub(display_width(value));

        writeln!(
            out,
            "{:>label_pad$}{label}  {:>value_pad$}{value}",
            "", ""
        )?;
    }

    writeln!(out)?;

    Ok(())
}

/// Dims each run of box-drawing characters (U+2500..U+257F).
fn dim_borders(table: &str) -> String {
    const DIM: &str = "\x1b[90m";
    const RESET: &str = "\x1b[0m";

    let mut dimmed = String::with_capacity(table.len() * 2);
    let mut on_border = false;

    for ch in table.chars() {
        let border = matches!(ch, '\u{2500}'..='\u{257F}');

        if border != on_border {
            dimmed.push_str(if border { DIM } else { RESET });
            on_border = border;
        }

        dimmed.push(ch);
    }

    if on_border {
        dimmed.push_str(RESET);
    }

    dimmed
}

/// Printed width of `text`, not counting ANSI colour sequences.
fn display_width(text: &str) -> usize {
    let mut chars = text.chars();
    let mut width = 0;

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // Sequences end at their first letter.
            _ = chars.by_ref().find(char::is_ascii_alphabetic);
        } else {
            width += 1;
        }
    }

    width
}
