//! Connection Config

use std::time::Duration;

use clap::Args;

use crate::api::HttpCartApiConfig;

/// Storefront connection settings.
#[derive(Debug, Args)]
pub struct ConnectionConfig {
    /// Storefront origin
    #[arg(long, env = "LIEFERSPATZ_BASE_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    /// `Cookie` header carrying the storefront session
    #[arg(long, env = "LIEFERSPATZ_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "LIEFERSPATZ_REQUEST_TIMEOUT_MS", default_value_t = 10_000_u64)]
    pub request_timeout_ms: u64,
}

impl ConnectionConfig {
    /// Client settings for these connection options.
    #[must_use]
    pub fn api_config(&self) -> HttpCartApiConfig {
        HttpCartApiConfig {
            base_url: self.base_url.clone(),
            session_cookie: self
                .session_cookie
                .clone()
                .filter(|cookie| !cookie.trim().is_empty()),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
