//! Configuration groups shared by the command line and the environment.

pub use cart::CartPolicyConfig;
pub use connection::ConnectionConfig;
pub use logging::{LogFormat, LoggingConfig};

mod cart;
mod connection;
mod logging;
