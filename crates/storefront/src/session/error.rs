//! Session error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors from session operations.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] youshop_core::EmailError),

    /// A required field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Operation needs a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected the request or could not be reached.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Returns true if the stored session is gone and the user must sign in
    /// again.
    #[must_use]
    pub const fn is_session_lost(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Api(e) => matches!(e.kind, crate::api::ErrorKind::SessionExpired),
            _ => false,
        }
    }
}
