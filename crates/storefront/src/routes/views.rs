//! View models shared by several pages.
//!
//! Templates receive preformatted strings; money is formatted once here.

use askama::Template;
use askama_web::WebTemplate;
use rust_decimal::Decimal;

use ayts_core::{Cart, CartLineItem, Price, ShoppingState, StoreGroup};

use crate::api::Product;
use crate::filters;

/// Format an amount in pesos, e.g. `₱135.00`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    Price::php(amount).to_string()
}

/// Data every page's header needs.
#[derive(Debug, Clone, Default)]
pub struct LayoutView {
    pub cart_count: u64,
    pub location_name: Option<String>,
}

impl LayoutView {
    #[must_use]
    pub fn new(state: &ShoppingState) -> Self {
        Self {
            cart_count: state.cart.item_count(),
            location_name: state.location.as_ref().map(|l| l.name.clone()),
        }
    }
}

/// One cart line for display.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: String,
    pub store_id: String,
    pub name: String,
    pub unit: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

impl From<&CartLineItem> for CartLineView {
    fn from(line: &CartLineItem) -> Self {
        Self {
            product_id: line.id.to_string(),
            store_id: line.store_id.to_string(),
            name: line.name.clone(),
            unit: line.unit.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            price: format_price(line.price),
            line_total: format_price(line.line_total()),
        }
    }
}

/// Cart lines of one store.
#[derive(Debug, Clone)]
pub struct StoreGroupView {
    pub store_id: String,
    pub store_name: String,
    pub items: Vec<CartLineView>,
    pub subtotal: String,
}

impl From<&StoreGroup<'_>> for StoreGroupView {
    fn from(group: &StoreGroup<'_>) -> Self {
        Self {
            store_id: group.store_id.to_string(),
            store_name: group.store_name.to_string(),
            items: group.items.iter().map(|line| CartLineView::from(*line)).collect(),
            subtotal: format_price(group.subtotal()),
        }
    }
}

/// The whole cart, grouped by store.
#[derive(Debug, Clone)]
pub struct CartView {
    pub groups: Vec<StoreGroupView>,
    pub total: String,
    pub item_count: u64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            groups: cart.by_store().iter().map(StoreGroupView::from).collect(),
            total: format_price(cart.total()),
            item_count: cart.item_count(),
        }
    }
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

/// +/- controls for one product of one store.
#[derive(Debug, Clone)]
pub struct QuantityControlsView {
    pub product_id: String,
    pub store_id: String,
    pub quantity: u32,
}

/// A product tile on a store page.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub unit: String,
    pub image: Option<String>,
    pub in_stock: bool,
    pub controls: QuantityControlsView,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, cart: &Cart) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: format_price(product.price),
            unit: product.unit.clone().unwrap_or_default(),
            image: product.image().map(String::from),
            in_stock: product.in_stock(),
            controls: QuantityControlsView {
                product_id: product.id.to_string(),
                store_id: product.store_id.to_string(),
                quantity: cart.quantity_of(&product.id, &product.store_id),
            },
        }
    }
}

/// Shown when a store, product or order can't be loaded.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub layout: LayoutView,
    pub title: String,
    pub message: String,
    pub back_href: String,
    pub back_label: String,
}

impl NotFoundTemplate {
    #[must_use]
    pub fn new(layout: LayoutView, title: &str, back_href: &str, back_label: &str) -> Self {
        Self {
            layout,
            title: title.to_string(),
            message: "It may have been removed or is temporarily unavailable.".to_string(),
            back_href: back_href.to_string(),
            back_label: back_label.to_string(),
        }
    }
}
