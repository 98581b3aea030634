//! Async side of Lieferspatz: the storefront client, the cart controller and
//! the command line that drives them.

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod observability;
