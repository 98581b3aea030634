//! `lieferspatz-cart` command line.

use std::{
    io::{self, Write},
    sync::Arc,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use humanize_duration::{Truncate, prelude::DurationExt};
use thiserror::Error;
use tokio::{
    signal,
    sync::broadcast,
    time::{self, MissedTickBehavior},
};
use tracing::{info, warn};

use lieferspatz::{errors::CartError, items::ItemId, receipt::ReceiptError};

use crate::{
    api::{HttpCartApi, HttpCartApiError},
    config::{CartPolicyConfig, ConnectionConfig, LoggingConfig},
    controller::{CartController, CartEvent},
};

/// Lieferspatz cart client
#[derive(Debug, Parser)]
#[command(name = "lieferspatz-cart", about = "Lieferspatz cart client", long_about = None)]
pub struct Cli {
    /// Storefront connection settings.
    #[command(flatten)]
    pub connection: ConnectionConfig,

    /// Cart behaviour settings.
    #[command(flatten)]
    pub cart: CartPolicyConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Cart actions.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the number of items in the cart
    Count,

    /// Print the cart grouped by restaurant, with totals
    Show,

    /// Add an item to the cart
    Add {
        /// Menu item id
        item_id: ItemId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },

    /// Remove an item's line from the cart
    Remove {
        /// Menu item id
        item_id: ItemId,
    },

    /// Set a line to an exact quantity; zero removes it
    Set {
        /// Menu item id
        item_id: ItemId,

        /// New quantity
        quantity: u32,
    },

    /// Print the count whenever it changes, until interrupted
    Watch {
        /// Seconds between checks
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] HttpCartApiError),

    /// The storefront did not accept the action.
    #[error("{}", .0.user_message())]
    Cart(#[from] CartError),

    /// The summary could not be priced or written.
    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    /// The Ctrl+C handler could not be installed.
    #[error("failed to install Ctrl+C handler: {0}")]
    Signal(#[source] io::Error),
}

impl Cli {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Build a controller for the configured storefront and run the command.
///
/// # Errors
///
/// Returns a [`CliError`] if the client cannot be built or the command fails.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let api = HttpCartApi::new(cli.connection.api_config())?;
    let controller = CartController::new(Arc::new(api), cli.cart.settings());

    execute(&controller, cli.command, &mut io::stdout()).await
}

/// Run one command against a controller, writing results to `out`.
///
/// # Errors
///
/// Returns a [`CliError`] if the action fails or output cannot be written.
pub async fn execute(
    controller: &CartController,
    command: Command,
    out: &mut (impl Write + Send),
) -> Result<(), CliError> {
    let started = Instant::now();
    let mut events = controller.events();

    match command {
        Command::Count => {
            let count = controller.sync_count().await?;

            writeln!(out, "{count}")?;

            return Ok(());
        }
        Command::Show => {
            controller.load_cart().await?;
            controller.summary()?.write_to(out)?;
        }
        Command::Add { item_id, quantity } => controller.add_item(item_id, quantity).await?,
        Command::Remove { item_id } => controller.remove_item(item_id).await?,
        Command::Set { item_id, quantity } => {
            controller.load_cart().await?;
            controller.set_quantity(item_id, quantity).await?;
        }
        Command::Watch { interval_secs } => return watch(controller, interval_secs, out).await,
    }

    write_notices(&mut events, out)?;

    writeln!(
        out,
        "{} in cart ({})",
        units(controller.get_count()),
        elapsed(started)
    )?;

    Ok(())
}

async fn watch(
    controller: &CartController,
    interval_secs: u64,
    out: &mut (impl Write + Send),
) -> Result<(), CliError> {
    let mut ticker = time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut last_count = None;

    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.map_err(CliError::Signal)?;
                info!("ctrl_c signal received");

                return Ok(());
            }
            _ = ticker.tick() => {
                let started = Instant::now();

                match controller.sync_count().await {
                    Ok(count) if last_count != Some(count) => {
                        writeln!(out, "{} in cart (checked in {})", units(count), elapsed(started))?;

                        last_count = Some(count);
                    }
                    Ok(_) => {}
                    Err(error) if error.requires_login() => return Err(error.into()),
                    Err(error) => warn!("count check failed: {error}"),
                }
            }
        }
    }
}

fn write_notices(
    events: &mut broadcast::Receiver<CartEvent>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    while let Ok(event) = events.try_recv() {
        if let Some(notice) = event.notice() {
            writeln!(out, "{}", notice.text)?;
        }
    }

    Ok(())
}

fn units(count: u32) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

fn elapsed(started: Instant) -> String {
    let millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    format!("{}", Duration::from_millis(millis).human(Truncate::Nano))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use lieferspatz::{
        items::{CartItem, RestaurantId},
        payloads::{CartPayload, MutationAck},
    };

    use crate::{api::MockCartApi, controller::ControllerSettings};

    use super::*;

    fn pizza(quantity: u32) -> CartItem {
        CartItem::new(
            ItemId::new(1),
            "Margherita",
            Decimal::new(850, 2),
            quantity,
            RestaurantId::new(1),
            "Luigi's",
        )
    }

    #[test]
    fn parses_add_with_quantity() -> TestResult {
        let cli = Cli::try_parse_from(["lieferspatz-cart", "add", "42", "--quantity", "2"])?;

        assert_eq!(
            cli.command,
            Command::Add {
                item_id: ItemId::new(42),
                quantity: 2,
            }
        );

        Ok(())
    }

    #[test]
    fn rejects_non_numeric_item_ids() {
        assert!(Cli::try_parse_from(["lieferspatz-cart", "remove", "pizza"]).is_err());
    }

    #[tokio::test]
    async fn count_prints_the_server_count() -> TestResult {
        let mut api = MockCartApi::new();

        api.expect_fetch_count().once().returning(|| Ok(0));
        api.expect_fetch_cart().never();
        api.expect_add_item().never();
        api.expect_remove_item().never();

        let controller = CartController::new(Arc::new(api), ControllerSettings::default());
        let mut out = Vec::new();

        execute(&controller, Command::Count, &mut out).await?;

        assert_eq!(String::from_utf8(out)?, "0\n");

        Ok(())
    }

    #[tokio::test]
    async fn show_prints_lines_and_total() -> TestResult {
        let mut api = MockCartApi::new();

        api.expect_fetch_cart().once().returning(|| {
            Ok(CartPayload {
                items: vec![pizza(2)],
                total_price: Decimal::new(1700, 2),
            })
        });

        let controller = CartController::new(Arc::new(api), ControllerSettings::default());
        let mut out = Vec::new();

        execute(&controller, Command::Show, &mut out).await?;

        let text = String::from_utf8(out)?;

        assert!(text.contains("Margherita"), "missing line in {text}");
        assert!(text.contains("2 items in cart"), "missing count in {text}");

        Ok(())
    }

    #[tokio::test]
    async fn add_prints_the_confirmation() -> TestResult {
        let mut api = MockCartApi::new();

        api.expect_add_item().once().returning(|_, _| {
            Ok(MutationAck {
                success: Some(true),
                message: None,
                count: Some(1),
            })
        });

        api.expect_fetch_cart().once().returning(|| {
            Ok(CartPayload {
                items: vec![pizza(1)],
                total_price: Decimal::new(850, 2),
            })
        });

        let controller = CartController::new(Arc::new(api), ControllerSettings::default());
        let mut out = Vec::new();

        execute(
            &controller,
            Command::Add {
                item_id: ItemId::new(1),
                quantity: 1,
            },
            &mut out,
        )
        .await?;

        let text = String::from_utf8(out)?;

        assert!(text.starts_with("Item added to cart!\n"), "unexpected output {text}");
        assert!(text.contains("1 item in cart"), "missing count in {text}");

        Ok(())
    }

    #[tokio::test]
    async fn failures_show_the_user_message() {
        let mut api = MockCartApi::new();

        api.expect_remove_item()
            .once()
            .returning(|_| Err(CartError::SessionExpired));

        let controller = CartController::new(Arc::new(api), ControllerSettings::default());
        let mut out = Vec::new();

        let result = execute(
            &controller,
            Command::Remove {
                item_id: ItemId::new(1),
            },
            &mut out,
        )
        .await;

        assert!(matches!(
            result,
            Err(CliError::Cart(CartError::SessionExpired))
        ));
        assert_eq!(
            result.map_err(|error| error.to_string()),
            Err("Your session has expired. Please sign in again.".to_string())
        );
    }
}
