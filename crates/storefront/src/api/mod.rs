//! Backend REST API access.
//!
//! [`ApiClient::request`] is the single entry point: it attaches the bearer
//! token, applies the configured timeout and normalizes every failure into an
//! [`ApiError`].
//!
//! # 401 handling
//!
//! When a request that carried credentials comes back `401` and a refresh
//! token is held, the client exchanges it exactly once. Concurrent failures
//! share that exchange: they queue on a refresh gate and, once inside, skip
//! the exchange if the access token they sent has already been replaced.
//! A failed exchange clears the stored pair, surfaces
//! [`ErrorKind::SessionExpired`] and bumps the counter behind
//! [`ApiClient::session_lost`].
//!
//! The original request is never reissued here. A successful refresh is
//! reported through [`ApiError::credentials_refreshed`] and callers decide
//! whether to go again with [`reauth_once`].
//!
//! # Retries
//!
//! [`ApiClient::request_with_retry`] retries network, 5xx and 429 failures
//! with linear backoff, and only for `GET`, `PUT` and `DELETE`. `POST` and
//! `PATCH` always get a single attempt.

pub mod error;
mod page;
mod retry;

use std::fmt;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

pub use error::{ApiError, ErrorKind};
pub use page::{Page, Pagination};
pub use retry::{RetryPolicy, reauth_once, retry_request};

use crate::config::ApiConfig;
use crate::tokens::TokenStore;

/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// HTTP verbs used by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns true for verbs the retry wrapper may repeat.
    ///
    /// `PATCH` is excluded along with `POST`.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        matches!(self, Self::Get | Self::Put | Self::Delete)
    }

    const fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

/// A successful API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
}

/// Map a 404 to `None`, keeping every other failure.
///
/// # Errors
///
/// Returns the original error unless it was a not-found.
pub fn optional<T>(result: Result<ApiResponse<T>, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(response) => Ok(Some(response.data)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

struct RawResponse {
    status: u16,
    retry_after: Option<u64>,
    body: String,
}

impl RawResponse {
    const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

enum Recovery {
    /// A fresh access token is now held.
    Refreshed,
    /// No refresh token; the 401 stands.
    NotAttempted,
    /// The exchange failed and credentials were cleared.
    Expired,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the HTTP connection pool, the token store and
/// the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    config: ApiConfig,
    tokens: TokenStore,
    /// Serializes refresh-token exchanges
    refresh_gate: Mutex<()>,
    /// Number of failed refresh exchanges
    session_lost: watch::Sender<u64>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("timeout", &self.inner.config.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig, tokens: TokenStore) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                config,
                tokens,
                refresh_gate: Mutex::new(()),
                session_lost: watch::Sender::new(0),
            }),
        })
    }

    /// The credential pair this client authenticates with.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Notified each time a failed refresh clears the credentials.
    #[must_use]
    pub fn session_lost(&self) -> watch::Receiver<u64> {
        self.inner.session_lost.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Retry policy from the configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.inner.config.retry_attempts, self.inner.config.retry_delay)
    }

    // =========================================================================
    // Request
    // =========================================================================

    /// Send one request.
    ///
    /// `requires_auth` attaches the held access token and enables 401
    /// recovery. Bodies are never sent with `GET`. An empty success body
    /// decodes as JSON `null`; a non-JSON success body decodes as a string.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` classified by [`ErrorKind`].
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        let sent_token = if requires_auth {
            self.inner.tokens.access_token()
        } else {
            None
        };

        let raw = self
            .send(method, path, body.as_ref(), sent_token.as_ref())
            .await?;
        debug!(status = raw.status, "API response");

        if raw.is_success() {
            return decode(&raw).map(|data| ApiResponse {
                data,
                success: true,
            });
        }

        let error = ApiError::from_response(raw.status, &raw.body).with_retry_after(raw.retry_after);

        if raw.status == 401 && requires_auth {
            return Err(match self.recover_unauthorized(sent_token).await {
                Recovery::Refreshed => error.with_credentials_refreshed(),
                Recovery::NotAttempted => error,
                Recovery::Expired => ApiError {
                    details: error.details,
                    ..ApiError::session_expired()
                },
            });
        }

        Err(error)
    }

    /// Send a request, reissuing it once after a credential refresh.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's `ApiError`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        reauth_once(|| self.request(method, path, body.clone(), requires_auth)).await
    }

    /// [`call`](Self::call) under the configured retry policy.
    ///
    /// Only idempotent verbs are retried.
    ///
    /// # Errors
    ///
    /// Returns the last `ApiError` once attempts are exhausted or the failure
    /// is not retryable.
    pub async fn request_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        retry_request(self.retry_policy(), method, || {
            self.call(method, path, body.clone(), requires_auth)
        })
        .await
    }

    // =========================================================================
    // Convenience verbs
    // =========================================================================

    /// `GET` a path.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::Get, path, None, requires_auth).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::Post, path, Some(encode(body)?), requires_auth)
            .await
    }

    /// `PUT` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::Put, path, Some(encode(body)?), requires_auth)
            .await
    }

    /// `PATCH` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::Patch, path, Some(encode(body)?), requires_auth)
            .await
    }

    /// `DELETE` a path.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        requires_auth: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::Delete, path, None, requires_auth).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&SecretString>,
    ) -> Result<RawResponse, ApiError> {
        let mut request = self
            .inner
            .client
            .request(method.as_reqwest(), self.inner.config.endpoint(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body
            && method != Method::Get
        {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }

    /// Single-flight refresh after a 401 on a request sent with `sent_token`.
    async fn recover_unauthorized(&self, sent_token: Option<SecretString>) -> Recovery {
        let _gate = self.inner.refresh_gate.lock().await;
        let tokens = &self.inner.tokens;

        if !tokens.access_token_is(sent_token.as_ref()) {
            // Another request already refreshed or cleared while we waited.
            return if tokens.has_access_token() {
                debug!("Access token already refreshed by a concurrent request");
                Recovery::Refreshed
            } else {
                Recovery::Expired
            };
        }

        let Some(refresh_token) = tokens.refresh_token() else {
            return Recovery::NotAttempted;
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(refreshed) => {
                debug!("Access token refreshed");
                tokens.set_tokens(
                    SecretString::from(refreshed.access_token),
                    refreshed.refresh_token.map(SecretString::from),
                );
                Recovery::Refreshed
            }
            Err(e) => {
                warn!(error = %e, status = e.status_code, "Token refresh failed, clearing credentials");
                tokens.clear();
                self.inner.session_lost.send_modify(|lost| *lost += 1);
                Recovery::Expired
            }
        }
    }

    #[instrument(skip_all)]
    async fn exchange_refresh_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<RefreshResponse, ApiError> {
        let body = encode(&RefreshRequest {
            refresh_token: refresh_token.expose_secret(),
        })?;
        let raw = self
            .send(Method::Post, REFRESH_PATH, Some(&body), None)
            .await?;

        if !raw.is_success() {
            return Err(ApiError::from_response(raw.status, &raw.body));
        }
        decode(&raw)
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(ApiError::invalid_request)
}

fn decode<T: DeserializeOwned>(raw: &RawResponse) -> Result<T, ApiError> {
    let value = if raw.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw.body).unwrap_or_else(|_| Value::String(raw.body.clone()))
    };
    serde_json::from_value(value).map_err(|e| ApiError::invalid_response(raw.status, e))
}
