//! Application context.
//!
//! [`Storefront`] wires the components together once and hands out shared
//! handles. Nothing is global: each component gets its dependencies through
//! its constructor.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use youshop_core::CheckoutData;

use crate::api::ApiClient;
use crate::cart::CartManager;
use crate::catalog::CatalogService;
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::orders::{OrderService, Submission};
use crate::session::SessionManager;
use crate::storage::{FileStore, MemoryStore, SharedStore};
use crate::tokens::TokenStore;

/// The storefront client core.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    store: SharedStore,
    api: ApiClient,
    session: SessionManager,
    cart: CartManager,
    orders: OrderService,
    catalog: CatalogService,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build every component and restore persisted state.
    ///
    /// Storage is file-backed when `config.storage_dir` is set and in-memory
    /// otherwise. The cart is hydrated and the session resolved once.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or the
    /// HTTP client cannot be built.
    #[instrument(skip_all)]
    pub async fn start(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let store: SharedStore = match &config.storage_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };

        let storefront = Self::with_store(config, store)?;
        let state = storefront.inner.session.initialize().await;
        info!(
            authenticated = state.is_authenticated(),
            cart_items = storefront.inner.cart.item_count(),
            "Storefront ready"
        );

        Ok(storefront)
    }

    /// Build every component over `store` without contacting the backend.
    ///
    /// The session stays `Unknown` until
    /// [`SessionManager::initialize`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(config: StorefrontConfig, store: SharedStore) -> Result<Self, StorefrontError> {
        let tokens = TokenStore::load(Arc::clone(&store));
        let api = ApiClient::new(config.api.clone(), tokens)?;
        let session = SessionManager::new(api.clone());
        let cart = CartManager::load(Arc::clone(&store));
        let orders = OrderService::new(api.clone(), Arc::clone(&store));
        let catalog = CatalogService::new(api.clone(), config.catalog_cache_ttl);

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                store,
                api,
                session,
                cart,
                orders,
                catalog,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The underlying key-value storage.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Place an order for the current cart.
    ///
    /// The cart is cleared once the order has been submitted, whether the
    /// backend confirmed it or a local fallback record was kept. Validation
    /// failures leave the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Checkout` for an empty cart or incomplete
    /// checkout data.
    #[instrument(skip_all)]
    pub async fn checkout(&self, data: &CheckoutData) -> Result<Submission, StorefrontError> {
        let lines = self.inner.cart.lines();
        let user_id = self.inner.session.current_user().map(|user| user.id);

        let submission = self
            .inner
            .orders
            .create_order(&lines, data, user_id)
            .await?;

        if let Some(e) = &submission.remote_error {
            warn!(error = %e, "Order kept locally");
        }
        self.inner.cart.clear();

        Ok(submission)
    }
}
