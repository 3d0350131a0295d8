//! Unified error handling.
//!
//! Each component has its own error type; `StorefrontError` wraps them for
//! callers that drive several components, like the CLI.

use thiserror::Error;
use youshop_core::{CartError, CheckoutError};

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::session::AuthError;
use crate::storage::StorageError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend request failed.
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Cart(#[from] CartError),

    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    #[error("{0}")]
    Order(#[from] OrderError),
}

impl StorefrontError {
    /// Returns true if the error means the user has to sign in again.
    #[must_use]
    pub fn is_session_lost(&self) -> bool {
        match self {
            Self::Api(e)
            | Self::Order(OrderError::Api(e) | OrderError::NotKept { remote: e, .. }) => {
                e.is_auth_error()
            }
            Self::Auth(e) => e.is_session_lost(),
            _ => false,
        }
    }
}
