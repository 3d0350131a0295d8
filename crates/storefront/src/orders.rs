//! Order submission and history.
//!
//! Orders go to the backend with a single `POST` (never retried). If that
//! fails, a local fallback record is synthesized and kept in client storage
//! under the `local-` id prefix so the customer still sees the order. Every
//! result is an [`OrderRecord`], tagged with where it came from.
//!
//! Local records are superseded only through
//! [`OrderService::resubmit_local_order`]; no attempt is made to match them
//! against remote orders.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use youshop_core::{
    CartLine, CheckoutData, CheckoutError, CreateOrderRequest, LOCAL_ORDER_PREFIX, Order, OrderId,
    OrderRecord, OrderStatus, UserId,
};

use crate::api::{ApiClient, ApiError, ErrorKind, Method, Page, optional};
use crate::storage::{SharedStore, StorageError, get_json, keys, set_json};

const ORDERS_PATH: &str = "/orders";

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout data or cart failed validation; nothing was submitted.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("order storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order {id} cannot be cancelled while {status}")]
    NotCancellable { id: OrderId, status: OrderStatus },

    /// Only local fallback records can be resubmitted.
    #[error("order {0} is not a local order")]
    NotLocal(OrderId),

    /// The backend refused the order and the local copy could not be kept.
    #[error("order was not placed ({remote}) and could not be saved locally: {source}")]
    NotKept {
        remote: ApiError,
        #[source]
        source: StorageError,
    },
}

/// Outcome of submitting an order.
#[derive(Debug, Clone)]
pub struct Submission {
    pub record: OrderRecord,
    /// Why the remote call failed, for local fallback records.
    pub remote_error: Option<ApiError>,
}

/// A local fallback order with the request needed to resubmit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LocalOrder {
    order: Order,
    request: CreateOrderRequest,
}

/// Submits orders and reads order history.
#[derive(Clone)]
pub struct OrderService {
    inner: Arc<OrderServiceInner>,
}

struct OrderServiceInner {
    api: ApiClient,
    store: SharedStore,
    /// Serializes read-modify-write of the local order list
    local_lock: Mutex<()>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService").finish_non_exhaustive()
    }
}

impl OrderService {
    #[must_use]
    pub fn new(api: ApiClient, store: SharedStore) -> Self {
        Self {
            inner: Arc::new(OrderServiceInner {
                api,
                store,
                local_lock: Mutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit an order for `lines`.
    ///
    /// On remote failure the order is kept locally and returned as
    /// [`OrderRecord::LocalFallback`], with the failure in
    /// [`Submission::remote_error`]. Clearing the cart is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Checkout` if the lines are empty or the checkout
    /// data is incomplete, and `OrderError::NotKept` if the remote call
    /// failed and the fallback record could not be stored. Remote failures
    /// alone are not errors.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn create_order(
        &self,
        lines: &[CartLine],
        checkout: &CheckoutData,
        user_id: Option<UserId>,
    ) -> Result<Submission, OrderError> {
        let request = checkout.order_request(lines, user_id)?;

        match self.submit(&request).await {
            Ok(order) => {
                info!(order_id = %order.id, "Order confirmed");
                Ok(Submission {
                    record: OrderRecord::Confirmed(order),
                    remote_error: None,
                })
            }
            Err(e) => {
                let id = OrderId::new(format!("{LOCAL_ORDER_PREFIX}{}", Uuid::new_v4()));
                let order = Order::local_fallback(id, &request, Utc::now());
                warn!(
                    error = %e,
                    status = e.status_code,
                    order_id = %order.id,
                    "Order submission failed, keeping local fallback order"
                );

                if let Err(source) = self.update_local(|locals| {
                    locals.push(LocalOrder {
                        order: order.clone(),
                        request,
                    });
                }) {
                    tracing::error!(
                        error = %source,
                        order_id = %order.id,
                        "Failed to persist local order"
                    );
                    return Err(OrderError::NotKept { remote: e, source });
                }

                Ok(Submission {
                    record: OrderRecord::LocalFallback(order),
                    remote_error: Some(e),
                })
            }
        }
    }

    /// One `POST`, reissued only after a credential refresh.
    async fn submit(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        let body = serde_json::to_value(request).map_err(ApiError::invalid_request)?;
        self.inner
            .api
            .call::<Order>(Method::Post, ORDERS_PATH, Some(body), true)
            .await
            .map(|response| response.data)
    }

    /// Submit a stored local order to the backend.
    ///
    /// On success the local record is deleted and the confirmed order is
    /// returned. On failure the local record is kept.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotLocal` for server ids, `OrderError::NotFound`
    /// if no such local record exists, `OrderError::NotCancellable` for a
    /// record already cancelled, or the remote failure.
    #[instrument(skip(self))]
    pub async fn resubmit_local_order(&self, id: &OrderId) -> Result<OrderRecord, OrderError> {
        if !id.is_local() {
            return Err(OrderError::NotLocal(id.clone()));
        }
        let local = self
            .find_local(id)?
            .ok_or_else(|| OrderError::NotFound(id.clone()))?;
        if local.order.status == OrderStatus::Cancelled {
            return Err(OrderError::NotCancellable {
                id: id.clone(),
                status: local.order.status,
            });
        }

        let order = self.submit(&local.request).await?;
        self.update_local(|locals| locals.retain(|l| &l.order.id != id))?;
        info!(local_id = %id, order_id = %order.id, "Local order confirmed");

        Ok(OrderRecord::Confirmed(order))
    }

    // =========================================================================
    // History
    // =========================================================================

    /// All orders: remote confirmed orders, then local records, newest first
    /// within each group.
    ///
    /// Remote orders are fetched only with a session; if that fails only
    /// local records are returned.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Api` with `ErrorKind::SessionExpired` if the
    /// session could not be refreshed, or `OrderError::Storage` if local
    /// records cannot be read.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<OrderRecord>, OrderError> {
        let mut remote = Vec::new();
        if self.inner.api.tokens().has_access_token() {
            match self
                .inner
                .api
                .request_with_retry::<Page<Order>>(Method::Get, ORDERS_PATH, None, true)
                .await
            {
                Ok(response) => remote = response.data.items,
                Err(e) if e.kind == ErrorKind::SessionExpired => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, status = e.status_code, "Could not load remote orders, showing local orders only");
                }
            }
        }
        remote.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut local: Vec<Order> = self.load_local()?.into_iter().map(|l| l.order).collect();
        local.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(remote
            .into_iter()
            .map(OrderRecord::Confirmed)
            .chain(local.into_iter().map(OrderRecord::LocalFallback))
            .collect())
    }

    /// One order.
    ///
    /// Local ids are looked up locally only. Other ids go to the backend
    /// and a 404 is `None`; local records never carry server ids.
    ///
    /// # Errors
    ///
    /// Returns the remote error, or a storage failure for local ids.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Option<OrderRecord>, OrderError> {
        if id.is_local() {
            return Ok(self
                .find_local(id)?
                .map(|l| OrderRecord::LocalFallback(l.order)));
        }

        let path = format!("{ORDERS_PATH}/{id}");
        let order = optional(
            self.inner
                .api
                .request_with_retry::<Order>(Method::Get, &path, None, true)
                .await,
        )?;
        Ok(order.map(OrderRecord::Confirmed))
    }

    /// Cancel an order.
    ///
    /// Confirmed orders are cancelled on the backend. Local records are
    /// marked cancelled in local storage only.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::NotCancellable` for local
    /// records past `processing`, or the remote failure.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<OrderRecord, OrderError> {
        if id.is_local() {
            return self.cancel_local(id).map(OrderRecord::LocalFallback);
        }

        let path = format!("{ORDERS_PATH}/{id}/cancel");
        match self
            .inner
            .api
            .call::<Order>(Method::Post, &path, None, true)
            .await
        {
            Ok(response) => Ok(OrderRecord::Confirmed(response.data)),
            Err(e) if e.is_not_found() => Err(OrderError::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn cancel_local(&self, id: &OrderId) -> Result<Order, OrderError> {
        let mut outcome = Err(OrderError::NotFound(id.clone()));
        self.update_local(|locals| {
            if let Some(local) = locals.iter_mut().find(|l| &l.order.id == id) {
                outcome = if local.order.status.is_cancellable() {
                    local.order.status = OrderStatus::Cancelled;
                    local.order.updated_at = Some(Utc::now());
                    Ok(local.order.clone())
                } else {
                    Err(OrderError::NotCancellable {
                        id: id.clone(),
                        status: local.order.status,
                    })
                };
            }
        })?;
        outcome
    }

    /// Delete a local record. Returns true if one was removed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotLocal` for server ids, or a storage failure.
    pub fn discard_local_order(&self, id: &OrderId) -> Result<bool, OrderError> {
        if !id.is_local() {
            return Err(OrderError::NotLocal(id.clone()));
        }
        let mut removed = false;
        self.update_local(|locals| {
            let before = locals.len();
            locals.retain(|l| &l.order.id != id);
            removed = locals.len() < before;
        })?;
        Ok(removed)
    }

    /// Local fallback orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub fn local_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.load_local()?.into_iter().map(|l| l.order).collect())
    }

    // =========================================================================
    // Local storage
    // =========================================================================

    fn load_local(&self) -> Result<Vec<LocalOrder>, StorageError> {
        match get_json::<Vec<LocalOrder>>(self.inner.store.as_ref(), keys::ORDERS) {
            Ok(locals) => Ok(locals.unwrap_or_default()),
            Err(StorageError::Corrupt { key, source }) => {
                warn!(key, error = %source, "Stored orders unreadable, ignoring them");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn find_local(&self, id: &OrderId) -> Result<Option<LocalOrder>, StorageError> {
        Ok(self.load_local()?.into_iter().find(|l| &l.order.id == id))
    }

    fn update_local(&self, f: impl FnOnce(&mut Vec<LocalOrder>)) -> Result<(), StorageError> {
        let _guard = self
            .inner
            .local_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut locals = self.load_local()?;
        f(&mut locals);
        set_json(self.inner.store.as_ref(), keys::ORDERS, &locals)
    }
}
