//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};

use ayts_core::ProductId;

use crate::api::{ApiClient, Product};
use crate::filters;
use crate::middleware::RequireLocation;
use crate::routes::views::{LayoutView, NotFoundTemplate, format_price};
use crate::state::AppState;

/// Shown when a product's store can't be resolved.
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub compare_price: Option<String>,
    pub unit: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub inventory_count: i64,
    pub store_id: String,
    pub store_name: String,
}

impl ProductView {
    fn new(product: &Product, store_name: String) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: format_price(product.price),
            compare_price: product
                .compare_price
                .filter(|compare| *compare > product.price)
                .map(format_price),
            unit: product.unit.clone().unwrap_or_default(),
            images: product.images.clone(),
            tags: product.tags.clone(),
            in_stock: product.in_stock(),
            inventory_count: product.inventory_count,
            store_id: product.store_id.to_string(),
            store_name,
        }
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: LayoutView,
    pub product: ProductView,
    /// Already in the cart from this store.
    pub in_cart: u32,
}

/// Name of the store selling `product`.
///
/// Uses the embedded store when the backend sent one, otherwise asks for it.
pub async fn store_name_for(api: &ApiClient, product: &Product) -> String {
    if let Some(store) = &product.store {
        return store.name.clone();
    }
    match api.store(&product.store_id).await {
        Ok(store) => store.name,
        Err(e) => {
            warn!(error = %e, store_id = %product.store_id, "Failed to resolve product store");
            UNKNOWN_STORE.to_string()
        }
    }
}

/// Display product detail page.
#[instrument(skip(state, guard))]
pub async fn show(
    State(state): State<AppState>,
    guard: RequireLocation,
    Path(id): Path<String>,
) -> Response {
    let RequireLocation { visitor, .. } = guard;
    let product_id = ProductId::new(id);
    let api = visitor.api(&state).await;

    let product = match api.product(&product_id).await {
        Ok(product) => product,
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, product_id = %product_id, "Failed to load product");
            return (
                StatusCode::NOT_FOUND,
                NotFoundTemplate::new(
                    LayoutView::new(visitor.state()),
                    "Product not found",
                    "/stores",
                    "Back to stores",
                ),
            )
                .into_response();
        }
    };

    let store_name = store_name_for(&api, &product).await;
    ProductShowTemplate {
        layout: LayoutView::new(visitor.state()),
        in_cart: visitor
            .state()
            .cart
            .quantity_of(&product.id, &product.store_id),
        product: ProductView::new(&product, store_name),
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    use super::*;
    use crate::api::tests::client_for;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_compare_price_only_when_higher() {
        let view = ProductView::new(
            &product(json!({"id": "p1", "storeId": "s1", "name": "Rice", "price": 50, "comparePrice": 60})),
            "Fresh Mart".to_string(),
        );
        assert_eq!(view.compare_price.as_deref(), Some("₱60.00"));

        let view = ProductView::new(
            &product(json!({"id": "p1", "storeId": "s1", "name": "Rice", "price": 50, "comparePrice": 40})),
            "Fresh Mart".to_string(),
        );
        assert!(view.compare_price.is_none());
    }

    #[tokio::test]
    async fn test_store_name_prefers_embedded_store() {
        let api = client_for(Router::new()).await;
        let product = product(json!({
            "id": "p1", "storeId": "s1", "name": "Rice", "price": 50,
            "store": {"id": "s1", "name": "Fresh Mart"}
        }));

        assert_eq!(store_name_for(&api, &product).await, "Fresh Mart");
    }

    #[tokio::test]
    async fn test_store_name_fetches_store() {
        let api = client_for(Router::new().route(
            "/api/stores/{id}",
            get(|| async { Json(json!({"success": true, "data": {"id": "s1", "name": "Botika"}})) }),
        ))
        .await;
        let product = product(json!({"id": "p1", "storeId": "s1", "name": "Paracetamol", "price": 5}));

        assert_eq!(store_name_for(&api, &product).await, "Botika");
    }

    #[tokio::test]
    async fn test_store_name_falls_back() {
        let api = client_for(Router::new()).await;
        let product = product(json!({"id": "p1", "storeId": "s9", "name": "Rice", "price": 50}));

        assert_eq!(store_name_for(&api, &product).await, UNKNOWN_STORE);
    }
}
