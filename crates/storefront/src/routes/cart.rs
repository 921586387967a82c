//! Cart route handlers.
//!
//! Every mutation goes through the visitor's cart actor. HTMX callers pick the
//! partial they want back with the `fragment` form field; plain form posts are
//! redirected to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use ayts_core::{CartAction, ProductId, StoreId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireLocation, Visitor};
use crate::routes::products::store_name_for;
use crate::routes::views::{CartView, LayoutView, QuantityControlsView};
use crate::state::AppState;

/// Largest quantity a single add request may carry.
const MAX_ADD_QUANTITY: u32 = 99;

/// Partial returned by a cart mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fragment {
    /// Header badge.
    #[default]
    Count,
    /// +/- controls of the touched product.
    Controls,
    /// The cart page's item list.
    Cart,
    /// "Added to cart" notice on the product page.
    Added,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: LayoutView,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Quantity controls fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/quantity_controls.html")]
pub struct QuantityControlsTemplate {
    pub controls: QuantityControlsView,
}

/// Added-to-cart notice fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/added.html")]
pub struct AddedTemplate {
    pub name: String,
    pub quantity: u32,
    pub cart_count: u64,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub fragment: Fragment,
}

/// Quantity change form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub store_id: String,
    pub delta: i64,
    #[serde(default)]
    pub fragment: Fragment,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
    #[serde(default)]
    pub fragment: Fragment,
}

/// Clear cart form data.
#[derive(Debug, Default, Deserialize)]
pub struct ClearCartForm {
    #[serde(default)]
    pub fragment: Fragment,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Render the partial a mutation asked for.
fn mutation_response(
    visitor: &Visitor,
    headers: &HeaderMap,
    fragment: Fragment,
    touched: Option<(&ProductId, &StoreId)>,
    added: Option<(String, u32)>,
) -> Response {
    if !is_htmx(headers) {
        return Redirect::to("/cart").into_response();
    }

    let cart = &visitor.state().cart;
    let trigger = AppendHeaders([("HX-Trigger", "cart-updated")]);

    match (fragment, touched, added) {
        (Fragment::Controls, Some((product_id, store_id)), _) => (
            trigger,
            QuantityControlsTemplate {
                controls: QuantityControlsView {
                    product_id: product_id.to_string(),
                    store_id: store_id.to_string(),
                    quantity: cart.quantity_of(product_id, store_id),
                },
            },
        )
            .into_response(),
        (Fragment::Cart, _, _) => (
            trigger,
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response(),
        (Fragment::Added, _, Some((name, quantity))) => (
            trigger,
            AddedTemplate {
                name,
                quantity,
                cart_count: cart.item_count(),
            },
        )
            .into_response(),
        _ => (
            trigger,
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response(),
    }
}

/// Display cart page.
#[instrument(skip(guard))]
pub async fn show(guard: RequireLocation) -> CartShowTemplate {
    let RequireLocation { visitor, .. } = guard;
    CartShowTemplate {
        layout: LayoutView::new(visitor.state()),
        cart: CartView::from(&visitor.state().cart),
    }
}

/// Add a product to the cart (HTMX).
///
/// The line is built from the backend's copy of the product, never from the
/// form. A quantity of `n` adds the product `n` times.
#[instrument(skip(state, visitor, headers))]
pub async fn add(
    State(state): State<AppState>,
    mut visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = form.quantity.unwrap_or(1);
    if quantity == 0 || quantity > MAX_ADD_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_ADD_QUANTITY}"
        )));
    }

    let product_id = ProductId::new(form.product_id.trim());
    let api = visitor.api(&state).await;
    let product = match api.product(&product_id).await {
        Ok(product) => product,
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, product_id = %product_id, "Failed to load product for cart");
            return Err(if e.is_not_found() {
                AppError::NotFound(format!("product {product_id}"))
            } else {
                AppError::Api(e)
            });
        }
    };

    let store_name = store_name_for(&api, &product).await;
    let line = product.to_line_item(&store_name);
    for _ in 0..quantity {
        visitor.dispatch(CartAction::Add(line.clone())).await?;
    }

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str()), ("store_id", product.store_id.as_str())]),
    );

    Ok(mutation_response(
        &visitor,
        &headers,
        form.fragment,
        Some((&product.id, &product.store_id)),
        Some((product.name, quantity)),
    ))
}

/// Change a line's quantity by `delta` (HTMX).
#[instrument(skip(visitor, headers))]
pub async fn update(
    mut visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id.trim());
    let store_id = StoreId::new(form.store_id.trim());
    if store_id.as_str().is_empty() {
        return Err(AppError::BadRequest("store_id is required".to_string()));
    }

    visitor
        .dispatch(CartAction::UpdateQuantity {
            product_id: product_id.clone(),
            store_id: store_id.clone(),
            delta: form.delta,
        })
        .await?;

    Ok(mutation_response(
        &visitor,
        &headers,
        form.fragment,
        Some((&product_id, &store_id)),
        None,
    ))
}

/// Remove a product from the cart (HTMX).
#[instrument(skip(visitor, headers))]
pub async fn remove(
    mut visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id.trim());
    visitor.dispatch(CartAction::Remove(product_id)).await?;
    Ok(mutation_response(&visitor, &headers, form.fragment, None, None))
}

/// Empty the cart (HTMX).
#[instrument(skip(visitor, headers))]
pub async fn clear(
    mut visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<ClearCartForm>,
) -> Result<Response> {
    visitor.dispatch(CartAction::Clear).await?;
    Ok(mutation_response(&visitor, &headers, form.fragment, None, None))
}

/// Get cart count badge (HTMX).
#[instrument(skip(visitor))]
pub async fn count(visitor: Visitor) -> CartCountTemplate {
    CartCountTemplate {
        count: visitor.state().cart.item_count(),
    }
}
