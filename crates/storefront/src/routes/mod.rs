//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Location picker (redirects once one is chosen)
//! POST /location               - Select delivery location
//! POST /location/clear         - Forget delivery location
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (visitor state backend)
//!
//! # Browsing (requires a location)
//! GET  /categories             - Category grid
//! POST /categories             - Select category
//! GET  /stores                 - Stores in the location (?category=, ?sort=)
//! GET  /stores/{id}            - Store detail with products
//! GET  /stores/{id}/products   - Product search fragment (HTMX, debounced)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add product (fragment=count|controls|added)
//! POST /cart/update            - Change quantity by delta
//! POST /cart/remove            - Remove product
//! POST /cart/clear             - Empty cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Delivery form and summary
//! POST /checkout               - Place order
//! POST /checkout/validate      - Place-order button (fragment)
//!
//! # Orders
//! GET  /orders/{id}            - Order status
//! POST /orders/{id}/cancel     - Cancel order
//! ```

pub mod cart;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod home;
pub mod orders;
pub mod products;
pub mod stores;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/{id}", get(stores::show))
        .route("/{id}/products", get(stores::search_products))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/validate", post(checkout::validate))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Location
        .route("/", get(home::home))
        .route("/location", post(home::select))
        .route("/location/clear", post(home::clear))
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Browsing
        .route("/categories", get(categories::index).post(categories::select))
        .nest("/stores", store_routes())
        .route("/products/{id}", get(products::show))
        // Cart
        .nest("/cart", cart_routes())
        // Checkout
        .nest("/checkout", checkout_routes())
        // Orders
        .nest("/orders", order_routes())
}
