//! Session and authentication state.
//!
//! # State machine
//!
//! ```text
//! Unknown ──initialize──▶ Authenticated(user) | Anonymous
//! Anonymous ──login/register──▶ Authenticated(user)
//! Authenticated ──logout──▶ Anonymous        (always, even if the remote call fails)
//! Authenticated ──session expired──▶ Anonymous
//! ```
//!
//! A failed login or registration leaves the state as it was. The session
//! expires when any component's call ends in a failed token refresh: the
//! [`ApiClient`] reports it through [`ApiClient::session_lost`], and an
//! `Authenticated` state is never reported without a stored access token.
//!
//! Loading and error flags are tracked separately from the state. The error is
//! transient: it is replaced by the next operation and can be cleared with
//! [`SessionManager::clear_error`]. Observers get every transition through
//! [`SessionManager::subscribe`].

mod error;

use std::sync::{Arc, Weak};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use youshop_core::{Email, ProfileUpdate, User};

pub use error::AuthError;

use crate::api::{ApiClient, ApiError, ErrorKind, Method};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const PROFILE_PATH: &str = "/auth/profile";

/// Who is using the storefront.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    /// Not resolved yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(User),
}

impl AuthState {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub is_loading: bool,
    /// Message from the last failed operation.
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    user: User,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

/// Session manager.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    api: ApiClient,
    state: watch::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("snapshot", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager in the `Unknown` state.
    ///
    /// Inside a Tokio runtime a task follows the client's session-loss
    /// signal so subscribers see the expiry as it happens.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let lost = api.session_lost();
        let (state, _) = watch::channel(SessionSnapshot::default());
        let inner = Arc::new(SessionManagerInner { api, state });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(follow_session_loss(Arc::downgrade(&inner), lost));
        }
        Self { inner }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.expire_if_unbacked();
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.expire_if_unbacked();
        self.inner.state.borrow().state.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.expire_if_unbacked();
        self.inner.state.borrow().state.user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.expire_if_unbacked();
        self.inner.state.borrow().state.is_authenticated()
    }

    /// Receive every snapshot change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Drop the transient error message.
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|s| s.error.take().is_some());
    }

    fn begin(&self) {
        self.inner.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish(&self, state: Option<AuthState>, error: Option<String>) {
        self.inner.state.send_modify(|s| {
            if let Some(state) = state {
                s.state = state;
            }
            s.is_loading = false;
            s.error = error;
        });
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolve the current user from the stored access token.
    ///
    /// Any failure, including a missing token, ends `Anonymous` with the
    /// stored credentials cleared. No error is surfaced.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> AuthState {
        self.begin();
        let tokens = self.inner.api.tokens();

        let state = if tokens.has_access_token() {
            match self
                .inner
                .api
                .call::<User>(Method::Get, PROFILE_PATH, None, true)
                .await
            {
                Ok(response) => {
                    debug!(user_id = %response.data.id, "Session restored");
                    AuthState::Authenticated(response.data)
                }
                Err(e) => {
                    warn!(error = %e, status = e.status_code, "Could not restore session, clearing credentials");
                    tokens.clear();
                    AuthState::Anonymous
                }
            }
        } else {
            tokens.clear();
            AuthState::Anonymous
        };

        self.finish(Some(state.clone()), None);
        state
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingField` before
    /// any request is made, or `AuthError::Api` if the backend rejects the
    /// credentials. The state is left as it was on failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        self.begin();
        let result = self.try_login(email, password).await;
        self.complete_sign_in(result)
    }

    async fn try_login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError> {
        let email = Email::parse(email)?;
        require(password.expose_secret(), "password")?;

        let body = LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        Ok(self
            .inner
            .api
            .post::<AuthResponse, _>(LOGIN_PATH, &body, false)
            .await?
            .data)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<User, AuthError> {
        self.begin();
        let result = self
            .try_register(first_name, last_name, email, password)
            .await;
        self.complete_sign_in(result)
    }

    async fn try_register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, AuthError> {
        require(first_name, "first name")?;
        require(last_name, "last name")?;
        let email = Email::parse(email)?;
        require(password.expose_secret(), "password")?;

        let body = RegisterRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            first_name: first_name.trim(),
            last_name: last_name.trim(),
        };
        Ok(self
            .inner
            .api
            .post::<AuthResponse, _>(REGISTER_PATH, &body, false)
            .await?
            .data)
    }

    fn complete_sign_in(&self, result: Result<AuthResponse, AuthError>) -> Result<User, AuthError> {
        match result {
            Ok(auth) => {
                self.inner.api.tokens().set_tokens(
                    SecretString::from(auth.access_token),
                    auth.refresh_token.map(SecretString::from),
                );
                info!(user_id = %auth.user.id, "Signed in");
                self.finish(Some(AuthState::Authenticated(auth.user.clone())), None);
                Ok(auth.user)
            }
            Err(e) => {
                // Whoever was signed in before still is.
                self.finish(None, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Sign out.
    ///
    /// The remote call is best effort. Local credentials are cleared and the
    /// state becomes `Anonymous` whatever it returns.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.begin();
        let api = &self.inner.api;

        if api.tokens().has_access_token()
            && let Err(e) = api
                .request::<serde_json::Value>(Method::Post, LOGOUT_PATH, None, true)
                .await
        {
            warn!(error = %e, status = e.status_code, "Remote logout failed, signing out locally");
        }

        api.tokens().clear();
        self.finish(Some(AuthState::Anonymous), None);
        info!("Signed out");
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when nobody is signed in, or
    /// `AuthError::Api` on failure. An expired session drops to `Anonymous`.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> Result<User, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        let body = serde_json::to_value(changes).map_err(ApiError::invalid_request)?;
        self.begin();

        match self
            .inner
            .api
            .call::<User>(Method::Put, PROFILE_PATH, Some(body), true)
            .await
        {
            Ok(response) => {
                let user = response.data;
                self.finish(Some(AuthState::Authenticated(user.clone())), None);
                Ok(user)
            }
            Err(e) => {
                let state = (e.kind == ErrorKind::SessionExpired).then_some(AuthState::Anonymous);
                self.finish(state, Some(e.to_string()));
                Err(e.into())
            }
        }
    }
}

impl SessionManagerInner {
    /// Drop an `Authenticated` state whose access token is gone.
    fn expire_if_unbacked(&self) {
        if self.api.tokens().has_access_token() {
            return;
        }
        let expired = self.state.send_if_modified(|s| {
            if !s.state.is_authenticated() {
                return false;
            }
            s.state = AuthState::Anonymous;
            s.error = Some(ApiError::session_expired().message);
            true
        });
        if expired {
            info!("Session expired, signed out");
        }
    }
}

async fn follow_session_loss(
    session: Weak<SessionManagerInner>,
    mut lost: watch::Receiver<u64>,
) {
    while lost.changed().await.is_ok() {
        let Some(inner) = session.upgrade() else {
            break;
        };
        inner.expire_if_unbacked();
    }
}

fn require(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::MissingField(field))
    } else {
        Ok(())
    }
}
