//! Cart errors.

use thiserror::Error;

use crate::items::ItemId;

const GENERIC_REJECTION: &str = "The restaurant could not update your cart. Please try again.";

/// Failures surfaced by cart synchronization.
///
/// Cloneable so that every caller collapsed onto a single in-flight load
/// receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The request never produced a response (offline, refused, timed out).
    #[error("network error: {0}")]
    Network(String),

    /// HTML arrived where JSON was expected: the storefront redirected to its
    /// login page.
    #[error("session expired")]
    SessionExpired,

    /// The storefront answered with a failure status or `success: false`.
    #[error("request rejected with status {status}")]
    ServerRejected {
        /// HTTP status code
        status: u16,

        /// Message supplied by the storefront, if any
        message: Option<String>,
    },

    /// The body could not be understood.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Quantities sent to the storefront must be at least one.
    #[error("invalid quantity {0}")]
    InvalidQuantity(u32),

    /// The item has no confirmed line in the cart.
    #[error("item {0} is not in the cart")]
    NotInCart(ItemId),
}

impl CartError {
    /// Build a network error from any transport failure.
    pub fn network(error: impl ToString) -> Self {
        Self::Network(error.to_string())
    }

    /// Whether the user can reasonably try the same action again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::UnexpectedResponse(_) => true,
            Self::ServerRejected { status, .. } => *status >= 500,
            Self::SessionExpired | Self::InvalidQuantity(_) | Self::NotInCart(_) => false,
        }
    }

    /// Whether the UI should send the user to the login page.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Text for the transient notice shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "You appear to be offline. Your cart was not changed.".to_string(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::ServerRejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::ServerRejected { .. } | Self::UnexpectedResponse(_) => {
                GENERIC_REJECTION.to_string()
            }
            Self::InvalidQuantity(_) => "Please choose at least one item.".to_string(),
            Self::NotInCart(_) => "That item is no longer in your cart.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_preferred() {
        let error = CartError::ServerRejected {
            status: 409,
            message: Some("Item sold out".to_string()),
        };

        assert_eq!(error.user_message(), "Item sold out");
        assert!(!error.is_retryable());
    }

    #[test]
    fn blank_server_message_falls_back_to_generic_text() {
        let error = CartError::ServerRejected {
            status: 400,
            message: Some("  ".to_string()),
        };

        assert_eq!(error.user_message(), GENERIC_REJECTION);
    }

    #[test]
    fn server_failures_are_retryable() {
        let error = CartError::ServerRejected {
            status: 503,
            message: None,
        };

        assert!(error.is_retryable());
    }

    #[test]
    fn session_expiry_requires_login_and_is_final() {
        assert!(CartError::SessionExpired.requires_login());
        assert!(!CartError::SessionExpired.is_retryable());
        assert!(CartError::network("offline").is_retryable());
    }
}
