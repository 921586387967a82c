//! Checkout: delivery form, order summary and placing the order.
//!
//! Orders are cash on delivery and go to exactly one store, so carts that
//! span several stores are refused before the form is shown.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use ayts_core::checkout::{checkout_store, delivery_fee};
use ayts_core::{Cart, CartAction, CheckoutSummary, DeliveryForm, PaymentMethod, StoreId};

use crate::api::{ApiClient, NewOrder, OrderLine};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::Visitor;
use crate::routes::views::{CartView, LayoutView, format_price};
use crate::state::AppState;

/// Money breakdown for display.
#[derive(Debug, Clone)]
pub struct SummaryView {
    pub item_count: u64,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
}

impl From<&CheckoutSummary> for SummaryView {
    fn from(summary: &CheckoutSummary) -> Self {
        Self {
            item_count: summary.item_count,
            subtotal: format_price(summary.subtotal),
            delivery_fee: format_price(summary.delivery_fee),
            total: format_price(summary.total()),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: LayoutView,
    pub cart: CartView,
    pub store_name: String,
    pub summary: SummaryView,
    pub form: DeliveryForm,
    /// Why the order can't be placed, shown above the form.
    pub error: Option<String>,
    /// Cart is orderable at all (single store).
    pub orderable: bool,
}

impl CheckoutTemplate {
    /// The place-order button is enabled.
    #[must_use]
    pub fn can_place(&self) -> bool {
        self.orderable && self.form.is_complete()
    }
}

/// Place-order button fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/place_order_button.html")]
pub struct PlaceOrderButtonTemplate {
    pub enabled: bool,
}

/// Order placed template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub layout: LayoutView,
    pub order_id: String,
    pub reference: String,
    pub total: String,
    pub address: String,
}

/// What the cart allows at checkout.
enum Readiness {
    Empty,
    Blocked { message: String, fee: Decimal },
    Ready { store_id: StoreId, store_name: String, fee: Decimal },
}

/// Resolve the checkout store and its delivery fee.
async fn readiness(state: &AppState, visitor: &Visitor, api: &ApiClient) -> Readiness {
    let fallback = state.config().shopping.fallback_delivery_fee;
    let cart = &visitor.state().cart;

    let store_id = match checkout_store(cart) {
        Ok(store_id) => store_id.clone(),
        Err(ayts_core::CheckoutError::EmptyCart) => return Readiness::Empty,
        Err(e) => {
            return Readiness::Blocked {
                message: e.to_string(),
                fee: fallback,
            };
        }
    };

    let store_name = cart
        .by_store()
        .first()
        .map(|group| group.store_name.to_string())
        .unwrap_or_default();

    let fee = match api.store(&store_id).await {
        Ok(store) => delivery_fee(store.delivery_fee, fallback),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, store_id = %store_id, "Failed to load store fee, using fallback");
            fallback
        }
    };

    Readiness::Ready {
        store_id,
        store_name,
        fee,
    }
}

fn page(
    visitor: &Visitor,
    form: DeliveryForm,
    readiness: &Readiness,
    error: Option<String>,
) -> CheckoutTemplate {
    let cart = &visitor.state().cart;
    let (store_name, fee, blocked) = match readiness {
        Readiness::Ready {
            store_name, fee, ..
        } => (store_name.clone(), *fee, None),
        Readiness::Blocked { message, fee } => (String::new(), *fee, Some(message.clone())),
        Readiness::Empty => (String::new(), Decimal::ZERO, None),
    };
    let orderable = blocked.is_none();

    CheckoutTemplate {
        layout: LayoutView::new(visitor.state()),
        cart: CartView::from(cart),
        store_name,
        summary: SummaryView::from(&CheckoutSummary::new(cart, fee)),
        form,
        error: blocked.or(error),
        orderable,
    }
}

/// Order request for a single-store cart.
fn build_order(cart: &Cart, store_id: StoreId, form: &DeliveryForm, fee: Decimal) -> NewOrder {
    let summary = CheckoutSummary::new(cart, fee);
    NewOrder {
        store_id,
        delivery_address: form.address.clone(),
        delivery_instructions: form.notes.clone(),
        customer_name: form.name.clone(),
        customer_phone: form.phone.clone(),
        customer_email: None,
        order_notes: form.notes.clone(),
        payment_method: PaymentMethod::CashOnDelivery,
        items: cart
            .items()
            .iter()
            .map(|line| OrderLine {
                product_id: line.id.clone(),
                quantity: line.quantity,
                unit_price: line.price,
            })
            .collect(),
        subtotal: summary.subtotal,
        delivery_fee: summary.delivery_fee,
        total_amount: summary.total(),
    }
}

/// Display the checkout form.
#[instrument(skip(state, visitor))]
pub async fn show(State(state): State<AppState>, visitor: Visitor) -> Response {
    let api = visitor.api(&state).await;
    let readiness = readiness(&state, &visitor, &api).await;
    if matches!(readiness, Readiness::Empty) {
        return Redirect::to("/cart").into_response();
    }
    page(&visitor, DeliveryForm::default(), &readiness, None).into_response()
}

/// Re-render the place-order button as the form is filled in (HTMX).
#[instrument(skip(visitor, form))]
pub async fn validate(visitor: Visitor, Form(form): Form<DeliveryForm>) -> PlaceOrderButtonTemplate {
    PlaceOrderButtonTemplate {
        enabled: form.is_complete() && checkout_store(&visitor.state().cart).is_ok(),
    }
}

/// Place the order.
#[instrument(skip(state, visitor, form))]
pub async fn place(
    State(state): State<AppState>,
    mut visitor: Visitor,
    Form(form): Form<DeliveryForm>,
) -> Result<Response> {
    let form = form.trimmed();
    let api = visitor.api(&state).await;

    let ready = readiness(&state, &visitor, &api).await;
    let (store_id, fee) = match &ready {
        Readiness::Empty => return Ok(Redirect::to("/cart").into_response()),
        Readiness::Ready { store_id, fee, .. } if form.is_complete() => (store_id.clone(), *fee),
        _ => return Ok(page(&visitor, form, &ready, None).into_response()),
    };

    let order = build_order(&visitor.state().cart, store_id.clone(), &form, fee);
    add_breadcrumb(
        "checkout",
        "Placing order",
        Some(&[("store_id", store_id.as_str())]),
    );

    match api.create_order(&order).await {
        Ok(placed) => {
            info!(order_id = %placed.id, store_id = %store_id, "Order placed");
            visitor.dispatch(CartAction::Clear).await?;
            Ok(CheckoutSuccessTemplate {
                layout: LayoutView::new(visitor.state()),
                order_id: placed.id.to_string(),
                reference: placed.reference().to_string(),
                total: format_price(order.total_amount),
                address: form.address,
            }
            .into_response())
        }
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, store_id = %store_id, "Order was not placed");
            Ok(page(
                &visitor,
                form,
                &ready,
                Some(format!("We couldn't place your order: {e}")),
            )
            .into_response())
        }
    }
}
