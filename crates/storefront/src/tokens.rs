//! Credential pair storage.
//!
//! Holds the access/refresh token pair in memory and writes every change
//! through to the durable store. Storage failures are logged and otherwise
//! ignored: the in-memory pair stays authoritative for this process.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::storage::{SharedStore, keys};

#[derive(Default)]
struct TokenPair {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
}

/// Shared handle to the credential pair.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

struct TokenStoreInner {
    store: SharedStore,
    tokens: RwLock<TokenPair>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.read();
        f.debug_struct("TokenStore")
            .field("access", &tokens.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &tokens.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TokenStore {
    /// Load any persisted pair from `store`.
    ///
    /// An unreadable store is treated as empty.
    #[must_use]
    pub fn load(store: SharedStore) -> Self {
        let read = |key: &str| match store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()).map(SecretString::from),
            Err(e) => {
                warn!(error = %e, key, "Failed to read stored token");
                None
            }
        };
        let tokens = TokenPair {
            access: read(keys::ACCESS_TOKEN),
            refresh: read(keys::REFRESH_TOKEN),
        };

        Self {
            inner: Arc::new(TokenStoreInner {
                store,
                tokens: RwLock::new(tokens),
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TokenPair> {
        self.inner
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TokenPair> {
        self.inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().access.clone()
    }

    /// Current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().refresh.clone()
    }

    /// Returns true if an access token is held.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.read().access.is_some()
    }

    /// Returns true if the held access token equals `token`.
    #[must_use]
    pub fn access_token_is(&self, token: Option<&SecretString>) -> bool {
        let tokens = self.read();
        match (tokens.access.as_ref(), token) {
            (Some(held), Some(token)) => held.expose_secret() == token.expose_secret(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Store a new pair. A `None` refresh token keeps the existing one.
    pub fn set_tokens(&self, access: SecretString, refresh: Option<SecretString>) {
        self.persist(keys::ACCESS_TOKEN, Some(&access));
        if let Some(refresh) = refresh.as_ref() {
            self.persist(keys::REFRESH_TOKEN, Some(refresh));
        }

        let mut tokens = self.write();
        tokens.access = Some(access);
        if refresh.is_some() {
            tokens.refresh = refresh;
        }
    }

    /// Forget both tokens.
    pub fn clear(&self) {
        self.persist(keys::ACCESS_TOKEN, None);
        self.persist(keys::REFRESH_TOKEN, None);
        *self.write() = TokenPair::default();
    }

    fn persist(&self, key: &str, value: Option<&SecretString>) {
        let result = match value {
            Some(token) => self.inner.store.set(key, token.expose_secret()),
            None => self.inner.store.remove(key),
        };
        if let Err(e) = result {
            warn!(error = %e, key, "Failed to persist token");
        }
    }
}
