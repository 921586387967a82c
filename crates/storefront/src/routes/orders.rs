//! Order status and cancellation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, instrument, warn};

use ayts_core::{OrderId, OrderStatus};

use crate::api::Order;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::Visitor;
use crate::routes::views::{LayoutView, NotFoundTemplate, format_price};
use crate::state::AppState;

/// One line of a placed order.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub reference: String,
    pub status: String,
    pub payment_status: String,
    pub store_name: String,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
    pub address: String,
    pub placed_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancellable: bool,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.reference().to_string(),
            status: order.status.label().to_string(),
            payment_status: order.payment_status.label().to_string(),
            store_name: order
                .store
                .as_ref()
                .map(|store| store.name.clone())
                .unwrap_or_default(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: format_price(item.unit_price),
                    total: format_price(item.total_price),
                })
                .collect(),
            subtotal: format_price(order.subtotal),
            delivery_fee: format_price(order.delivery_fee),
            total: format_price(order.total_amount),
            address: order.delivery_address.clone(),
            placed_at: order
                .created_at
                .map(|at| at.format("%b %-d, %Y %H:%M").to_string()),
            cancellation_reason: order.cancellation_reason.clone(),
            cancellable: order.status.is_cancellable(),
        }
    }
}

/// Order status page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: LayoutView,
    pub order: OrderView,
}

fn not_found(visitor: &Visitor) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate::new(
            LayoutView::new(visitor.state()),
            "Order not found",
            "/categories",
            "Continue shopping",
        ),
    )
        .into_response()
}

/// Display an order.
#[instrument(skip(state, visitor))]
pub async fn show(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
) -> Response {
    let order_id = OrderId::new(id);
    let api = visitor.api(&state).await;

    match api.order(&order_id).await {
        Ok(order) => OrderShowTemplate {
            layout: LayoutView::new(visitor.state()),
            order: OrderView::from(&order),
        }
        .into_response(),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, order_id = %order_id, "Failed to load order");
            not_found(&visitor)
        }
    }
}

/// Cancel an order and show its new status.
#[instrument(skip(state, visitor))]
pub async fn cancel(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
) -> Result<Response> {
    let order_id = OrderId::new(id);
    let api = visitor.api(&state).await;

    add_breadcrumb(
        "order",
        "Cancelling order",
        Some(&[("order_id", order_id.as_str())]),
    );

    match api.cancel_order(&order_id).await {
        Ok(order) => {
            if order.status == OrderStatus::Cancelled {
                info!(order_id = %order_id, "Order cancelled");
            }
            Ok(Redirect::to(&format!("/orders/{order_id}")).into_response())
        }
        Err(e) if e.is_not_found() => {
            visitor.observe(&e).await;
            Ok(not_found(&visitor))
        }
        Err(e) => {
            visitor.observe(&e).await;
            Err(AppError::Api(e))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "o1",
            "orderNumber": "AYTS-0001",
            "storeId": "s1",
            "status": "pending",
            "subtotal": 135,
            "deliveryFee": 50,
            "totalAmount": 185,
            "items": [
                {"productId": "p1", "productName": "Bananas", "unitPrice": 45, "quantity": 3, "totalPrice": 135}
            ],
            "store": {"id": "s1", "name": "Fresh Mart"}
        }))
        .unwrap();

        let view = OrderView::from(&order);

        assert_eq!(view.reference, "AYTS-0001");
        assert_eq!(view.total, "₱185.00");
        assert_eq!(view.items[0].total, "₱135.00");
        assert_eq!(view.store_name, "Fresh Mart");
        assert!(view.cancellable);
    }

    #[test]
    fn test_completed_order_is_not_cancellable() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "o2", "storeId": "s1", "status": "completed"
        }))
        .unwrap();

        let view = OrderView::from(&order);

        assert_eq!(view.reference, "o2");
        assert!(!view.cancellable);
    }
}
