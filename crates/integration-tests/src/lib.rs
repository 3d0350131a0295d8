//! Integration tests for the `YouShop` storefront core.
//!
//! Tests run the real storefront components against [`FakeBackend`], an
//! in-process `axum` server that speaks the backend's REST API on an
//! ephemeral port. Its behavior is steered through switches on
//! [`BackendState`] and every interesting endpoint counts its calls.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p youshop-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use youshop_core::{CheckoutData, CreateOrderRequest, Order, OrderId, OrderStatus};
use youshop_storefront::Storefront;
use youshop_storefront::config::{ApiConfig, StorefrontConfig};
use youshop_storefront::storage::{MemoryStore, SharedStore};
use youshop_storefront::tokens::TokenStore;

/// Password the fake backend accepts for every account.
pub const PASSWORD: &str = "correct-horse-battery";

/// Email the fake backend refuses to register.
pub const TAKEN_EMAIL: &str = "taken@example.com";

/// How long the fake refresh endpoint takes, so concurrent 401s overlap.
const REFRESH_LATENCY: Duration = Duration::from_millis(50);

/// How long `GET /slow` takes to answer.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

type Shared = Arc<BackendState>;

// =============================================================================
// Backend state
// =============================================================================

/// Switches and call counters of the fake backend.
#[derive(Debug)]
pub struct BackendState {
    refresh_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    order_posts: AtomicUsize,
    product_list_calls: AtomicUsize,

    fail_refresh: AtomicBool,
    fail_orders: AtomicBool,
    fail_logout: AtomicBool,
    product_failures: AtomicUsize,

    generation: AtomicUsize,
    access_token: Mutex<String>,
    refresh_token: Mutex<String>,
    user: Mutex<Value>,
    orders: Mutex<Vec<Order>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("fake backend lock poisoned")
}

impl BackendState {
    fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            order_posts: AtomicUsize::new(0),
            product_list_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            fail_orders: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            product_failures: AtomicUsize::new(0),
            generation: AtomicUsize::new(1),
            access_token: Mutex::new("access-1".to_string()),
            refresh_token: Mutex::new("refresh-1".to_string()),
            user: Mutex::new(json!({
                "id": "user_1",
                "email": "sam@example.com",
                "firstName": "Sam",
                "lastName": "Okafor",
                "addresses": []
            })),
            orders: Mutex::new(Vec::new()),
        }
    }

    /// The access token the backend currently accepts.
    #[must_use]
    pub fn access_token(&self) -> String {
        lock(&self.access_token).clone()
    }

    /// The refresh token the backend currently accepts.
    #[must_use]
    pub fn refresh_token(&self) -> String {
        lock(&self.refresh_token).clone()
    }

    /// Orders the backend has accepted.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        lock(&self.orders).clone()
    }

    /// Refresh exchanges attempted.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `GET /auth/profile` calls.
    #[must_use]
    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    /// `POST /orders` calls.
    #[must_use]
    pub fn order_posts(&self) -> usize {
        self.order_posts.load(Ordering::SeqCst)
    }

    /// `GET /catalog/products` calls.
    #[must_use]
    pub fn product_list_calls(&self) -> usize {
        self.product_list_calls.load(Ordering::SeqCst)
    }

    /// Reject every refresh exchange.
    pub fn fail_refresh(&self, on: bool) {
        self.fail_refresh.store(on, Ordering::SeqCst);
    }

    /// Answer `POST /orders` with 503.
    pub fn fail_orders(&self, on: bool) {
        self.fail_orders.store(on, Ordering::SeqCst);
    }

    /// Answer `POST /auth/logout` with 500.
    pub fn fail_logout(&self, on: bool) {
        self.fail_logout.store(on, Ordering::SeqCst);
    }

    /// Answer the next `n` product listings with 500.
    pub fn fail_product_listings(&self, n: usize) {
        self.product_failures.store(n, Ordering::SeqCst);
    }

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        Self::bearer(headers).is_some_and(|token| token == *lock(&self.access_token))
    }

    fn session_body(&self) -> Value {
        json!({
            "user": lock(&self.user).clone(),
            "accessToken": self.access_token(),
            "refreshToken": self.refresh_token(),
        })
    }
}

// =============================================================================
// Server
// =============================================================================

/// A fake backend listening on `127.0.0.1` until dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a fresh backend on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::new());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let app = router(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// API settings with short retry delays.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(10),
            ..ApiConfig::for_base_url(&self.base_url()).expect("fake backend URL")
        }
    }

    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig {
            api: self.api_config(),
            ..StorefrontConfig::default()
        }
    }

    /// A storefront over fresh in-memory storage.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn storefront_with(&self, store: SharedStore) -> Storefront {
        Storefront::with_store(self.config(), store).expect("build storefront")
    }

    /// In-memory storage holding an access token the backend no longer
    /// accepts, with a valid refresh token.
    #[must_use]
    pub fn stale_session_store(&self) -> SharedStore {
        let store: SharedStore = Arc::new(MemoryStore::new());
        TokenStore::load(Arc::clone(&store)).set_tokens(
            SecretString::from("access-0".to_string()),
            Some(SecretString::from(self.state.refresh_token())),
        );
        store
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A complete checkout form.
#[must_use]
pub fn checkout_data() -> CheckoutData {
    CheckoutData {
        email: "sam@example.com".to_string(),
        first_name: "Sam".to_string(),
        last_name: "Okafor".to_string(),
        phone: "555-0101".to_string(),
        address: "12 Harbour Rd".to_string(),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        zip_code: "97201".to_string(),
        country: "US".to_string(),
        card_number: SecretString::from("4242424242424242".to_string()),
        card_expiry: SecretString::from("12/30".to_string()),
        card_cvc: SecretString::from("123".to_string()),
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/profile", get(profile).put(update_profile))
        .route("/api/catalog/products", get(list_products))
        .route("/api/catalog/products/{id}", get(get_product))
        .route("/api/catalog/categories", get(list_categories))
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/slow", get(slow))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, message: impl Into<Value>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Invalid or expired token")
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["password"].as_str() != Some(PASSWORD) {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    if let Some(email) = body["email"].as_str() {
        lock(&state.user)["email"] = json!(email);
    }
    Json(state.session_body()).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"].as_str() == Some(TAKEN_EMAIL) {
        return error(
            StatusCode::BAD_REQUEST,
            json!(["email must be unique", "password is too weak"]),
        );
    }
    {
        let mut user = lock(&state.user);
        user["email"] = body["email"].clone();
        user["firstName"] = body["firstName"].clone();
        user["lastName"] = body["lastName"].clone();
    }
    (StatusCode::CREATED, Json(state.session_body())).into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(REFRESH_LATENCY).await;

    if state.fail_refresh.load(Ordering::SeqCst)
        || body["refreshToken"].as_str() != Some(state.refresh_token().as_str())
    {
        return error(StatusCode::UNAUTHORIZED, "Refresh token expired");
    }

    let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;
    *lock(&state.access_token) = format!("access-{generation}");
    *lock(&state.refresh_token) = format!("refresh-{generation}");

    Json(json!({
        "accessToken": state.access_token(),
        "refreshToken": state.refresh_token(),
    }))
    .into_response()
}

async fn logout(State(state): State<Shared>) -> Response {
    if state.fail_logout.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed");
    }
    Json(json!({ "success": true })).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(lock(&state.user).clone()).into_response()
}

async fn update_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut user = lock(&state.user);
    if let (Some(user), Some(changes)) = (user.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            user.insert(key.clone(), value.clone());
        }
    }
    Json(user.clone()).into_response()
}

fn catalog() -> Vec<Value> {
    vec![
        json!({"id": "p1", "name": "Sencha Green Tea", "description": "Steamed Japanese green tea", "price": "14.99", "categoryId": "tea", "images": ["{/img/sencha.jpg}"], "rating": 4.6, "reviews": 120}),
        json!({"id": "p2", "name": "Earl Grey", "description": "Black tea with bergamot", "price": 11.5, "categoryId": "tea", "rating": 4.2, "reviews": 87}),
        json!({"id": "p3", "name": "Jasmine Pearls", "description": "Hand-rolled green tea", "price": "24.00", "originalPrice": "30.00", "categoryId": "tea"}),
        json!({"id": "p4", "name": "Cast Iron Teapot", "description": "Keeps tea warm", "price": "59.99", "categoryId": "kitchen", "inStock": false}),
    ]
}

async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.product_list_calls.fetch_add(1, Ordering::SeqCst);
    if state
        .product_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Catalog unavailable");
    }

    let search = params.get("search").map(|s| s.to_lowercase());
    let mut products: Vec<Value> = catalog()
        .into_iter()
        .filter(|p| {
            params
                .get("category")
                .is_none_or(|c| p["categoryId"].as_str() == Some(c.as_str()))
        })
        .filter(|p| {
            search.as_ref().is_none_or(|term| {
                ["name", "description"]
                    .iter()
                    .any(|field| p[*field].as_str().is_some_and(|v| v.to_lowercase().contains(term)))
            })
        })
        .collect();

    let total = products.len();
    if let Some(limit) = params.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        products.truncate(limit);
    }

    Json(json!({
        "data": products,
        "pagination": {
            "page": 1,
            "limit": products.len(),
            "total": total,
            "totalPages": 1,
            "hasNext": false,
            "hasPrev": false
        }
    }))
    .into_response()
}

async fn get_product(Path(id): Path<String>) -> Response {
    catalog()
        .into_iter()
        .find(|p| p["id"].as_str() == Some(id.as_str()))
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p).into_response(),
        )
}

async fn list_categories() -> Response {
    Json(json!([
        {"id": "tea", "name": "Tea"},
        {"id": "kitchen", "name": "Kitchen", "description": "Brewing gear"}
    ]))
    .into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Response {
    state.order_posts.fetch_add(1, Ordering::SeqCst);
    if BackendState::bearer(&headers).is_some() && !state.authorized(&headers) {
        return unauthorized();
    }
    if state.fail_orders.load(Ordering::SeqCst) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Order service unavailable");
    }

    let mut orders = lock(&state.orders);
    let number = orders.len() + 1;
    let mut order = Order::local_fallback(OrderId::new(format!("ord_{number}")), &request, Utc::now());
    order.order_number = Some(format!("YS-{number:05}"));
    orders.push(order.clone());

    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "data": state.orders() })).into_response()
}

async fn get_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state
        .orders()
        .into_iter()
        .find(|o| o.id.as_str() == id)
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Order not found"),
            |o| Json(o).into_response(),
        )
}

async fn cancel_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut orders = lock(&state.orders);
    let Some(order) = orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    if !order.status.is_cancellable() {
        return error(StatusCode::BAD_REQUEST, "Order can no longer be cancelled");
    }
    order.status = OrderStatus::Cancelled;
    order.updated_at = Some(Utc::now());
    Json(order.clone()).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(SLOW_RESPONSE).await;
    Json(json!({ "ok": true })).into_response()
}
