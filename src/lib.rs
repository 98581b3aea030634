//! Lieferspatz
//!
//! Lieferspatz keeps a food-ordering storefront's cart in sync with the server: optimistic
//! counts, panel visibility and priced summaries, with no I/O of its own.

pub mod errors;
pub mod ids;
pub mod items;
pub mod panel;
pub mod payloads;
pub mod pending;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod state;
