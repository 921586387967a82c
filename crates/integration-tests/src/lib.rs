//! Integration test harness for the AYTS storefront.
//!
//! Each test starts two servers on ephemeral ports:
//!
//! - a fake marketplace backend (axum) serving a small fixed catalog and
//!   recording every order posted to it
//! - the storefront itself, wired to the fake backend, with in-memory
//!   sessions and visitor state
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ayts-integration-tests
//! ```
//!
//! No database or network access is needed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use reqwest::{Client, redirect};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};

use ayts_core::MemoryStore;
use ayts_storefront::{
    build_router,
    config::{ApiConfig, ShoppingConfig, StorefrontConfig},
    services::StateBackend,
    state::AppState,
};

/// Location id served by the fake backend.
pub const LOCATION_ID: &str = "6f1c2a9e-8b3d-4e5f-a1b2-c3d4e5f60718";

/// Delivery fee of store `s1`.
pub const FRESH_MART_FEE: i64 = 35;

/// Fallback fee configured for the storefront under test.
pub const FALLBACK_FEE: i64 = 50;

/// Quiet period for product search under test.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);

// =============================================================================
// Fake marketplace backend
// =============================================================================

/// What the fake backend has seen.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    orders: Arc<Mutex<Vec<Value>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
    order_rejection: Arc<Mutex<Option<String>>>,
}

impl BackendLog {
    /// Order bodies posted so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.orders.lock().unwrap().clone()
    }

    /// Ids of cancelled orders.
    #[must_use]
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Answer every following order with `success: false` and `message`.
    pub fn reject_orders(&self, message: &str) {
        *self.order_rejection.lock().unwrap() = Some(message.to_string());
    }
}

fn ok(data: Value) -> Response {
    Json(json!({"success": true, "data": data})).into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "error": format!("{what} not found")})),
    )
        .into_response()
}

fn stores() -> Vec<Value> {
    vec![
        json!({
            "id": "s1",
            "name": "Fresh Mart",
            "address": "12 Rizal St",
            "locationId": LOCATION_ID,
            "deliveryFee": "35.00",
            "rating": 4.5,
            "isVerified": true,
            "category": {"id": "c1", "name": "Grocery"}
        }),
        json!({
            "id": "s2",
            "name": "Botika ni Aling Nena",
            "address": "3 Mabini St",
            "locationId": LOCATION_ID,
            "rating": 4.8,
            "category": {"id": "c2", "name": "Pharmacy"}
        }),
    ]
}

fn products() -> Vec<Value> {
    vec![
        json!({"id": "p1", "storeId": "s1", "name": "Bananas", "price": 45, "unit": "per kg", "inventoryCount": 20}),
        json!({"id": "p2", "storeId": "s1", "name": "Rice", "price": 52.5, "unit": "per kg", "inventoryCount": 100}),
        json!({"id": "p3", "storeId": "s2", "name": "Paracetamol", "price": 5, "unit": "tablet", "inventoryCount": 500}),
    ]
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

async fn list_stores(Query(params): Query<HashMap<String, String>>) -> Response {
    let location = params.get("locationId").map(String::as_str);
    let found: Vec<_> = stores()
        .into_iter()
        .filter(|store| location.is_none_or(|id| field(store, "locationId") == id))
        .collect();
    ok(json!(found))
}

async fn show_store(Path(id): Path<String>) -> Response {
    stores()
        .into_iter()
        .find(|store| field(store, "id") == id)
        .map_or_else(|| not_found("Store"), ok)
}

async fn list_products(Query(params): Query<HashMap<String, String>>) -> Response {
    let store = params.get("store");
    let search = params.get("search").map(|s| s.to_lowercase());
    let found: Vec<_> = products()
        .into_iter()
        .filter(|product| store.is_none_or(|id| field(product, "storeId") == id))
        .filter(|product| {
            search
                .as_deref()
                .is_none_or(|q| field(product, "name").to_lowercase().contains(q))
        })
        .collect();
    ok(json!({"products": found}))
}

async fn show_product(Path(id): Path<String>) -> Response {
    products()
        .into_iter()
        .find(|product| field(product, "id") == id)
        .map_or_else(|| not_found("Product"), ok)
}

fn order(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "orderNumber": "AYTS-0001",
        "storeId": "s1",
        "status": status,
        "subtotal": 135,
        "deliveryFee": FRESH_MART_FEE,
        "totalAmount": 170,
        "deliveryAddress": "12 Rizal St",
        "items": [
            {"productId": "p1", "productName": "Bananas", "unitPrice": 45, "quantity": 3, "totalPrice": 135}
        ],
        "store": {"id": "s1", "name": "Fresh Mart"}
    })
}

async fn create_order(State(log): State<BackendLog>, Json(body): Json<Value>) -> Response {
    if field(&body, "storeId").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "storeId is required"})),
        )
            .into_response();
    }
    if let Some(message) = log.order_rejection.lock().unwrap().clone() {
        return Json(json!({"success": false, "error": message})).into_response();
    }
    log.orders.lock().unwrap().push(body);
    ok(order("o1", "pending"))
}

async fn show_order(Path(id): Path<String>) -> Response {
    if id == "o1" {
        ok(order("o1", "pending"))
    } else {
        not_found("Order")
    }
}

async fn cancel_order(State(log): State<BackendLog>, Path(id): Path<String>) -> Response {
    if id != "o1" {
        return not_found("Order");
    }
    log.cancelled.lock().unwrap().push(id);
    ok(order("o1", "cancelled"))
}

/// Router of the fake marketplace backend.
pub fn fake_backend(log: BackendLog) -> Router {
    Router::new()
        .route(
            "/api/stores/locations",
            get(|| async {
                ok(json!([{
                    "id": LOCATION_ID,
                    "name": "Poblacion",
                    "city": "Makati",
                    "province": "Metro Manila",
                    "isActive": true
                }]))
            }),
        )
        .route(
            "/api/stores/categories",
            get(|| async {
                ok(json!([
                    {"id": "c1", "name": "Grocery", "sortOrder": 1},
                    {"id": "c2", "name": "Pharmacy", "sortOrder": 2}
                ]))
            }),
        )
        .route("/api/stores", get(list_stores))
        .route("/api/stores/{id}", get(show_store))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(show_product))
        .route("/api/orders", post(create_order))
        .route("/api/orders/{id}", get(show_order))
        .route("/api/orders/{id}/cancel", put(cancel_order))
        .with_state(log)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

// =============================================================================
// Storefront under test
// =============================================================================

/// State that outlives one storefront process.
#[derive(Clone, Default)]
pub struct Persistence {
    pub sessions: tower_sessions::MemoryStore,
    pub visitors: MemoryStore,
}

/// A running storefront plus its fake backend.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub backend: BackendLog,
    pub persistence: Persistence,
    backend_url: String,
}

fn config(api_url: String) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost".to_string(),
        api: ApiConfig {
            base_url: api_url,
            timeout: Duration::from_secs(5),
        },
        shopping: ShoppingConfig {
            search_debounce: SEARCH_DEBOUNCE,
            fallback_delivery_fee: Decimal::from(FALLBACK_FEE),
            ..ShoppingConfig::default()
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

async fn start_storefront(api_url: String, persistence: &Persistence) -> String {
    let state = AppState::new(
        config(api_url),
        StateBackend::Memory(persistence.visitors.clone()),
    )
    .unwrap();
    let addr = serve(build_router(state, persistence.sessions.clone())).await;
    format!("http://{addr}")
}

/// Cookie-keeping client that does not follow redirects.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

impl TestApp {
    /// Start a fake backend and a storefront pointed at it.
    pub async fn spawn() -> Self {
        let backend = BackendLog::default();
        let backend_url = format!("http://{}", serve(fake_backend(backend.clone())).await);
        let persistence = Persistence::default();
        let base_url = start_storefront(backend_url.clone(), &persistence).await;

        Self {
            base_url,
            client: browser(),
            backend,
            persistence,
            backend_url,
        }
    }

    /// Start a second storefront process over the same sessions and visitor
    /// state, keeping this app's browser cookies.
    pub async fn restart(self) -> Self {
        let base_url = start_storefront(self.backend_url.clone(), &self.persistence).await;
        Self { base_url, ..self }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn htmx_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Pick the fake backend's location.
    pub async fn select_location(&self) {
        let response = self
            .post(
                "/location",
                &[
                    ("id", LOCATION_ID),
                    ("name", "Poblacion"),
                    ("area", "Makati, Metro Manila"),
                ],
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    }

    /// Add `quantity` of a product and return the new cart count.
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> u64 {
        let quantity = quantity.to_string();
        let response = self
            .htmx_post(
                "/cart/add",
                &[("product_id", product_id), ("quantity", &quantity)],
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        self.cart_count().await
    }

    /// Current header badge count.
    pub async fn cart_count(&self) -> u64 {
        let body = self.htmx_get("/cart/count").await.text().await.unwrap();
        badge_count(&body)
    }
}

/// Number inside the cart badge markup.
#[must_use]
pub fn badge_count(html: &str) -> u64 {
    let start = html.find('>').map_or(0, |i| i + 1);
    let end = html[start..].find('<').map_or(html.len(), |i| start + i);
    html[start..end].trim().parse().unwrap()
}
