//! Checkout rules: delivery form completeness, single-store carts, totals.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::cart::Cart;
use crate::types::StoreId;

/// Delivery information entered at checkout. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeliveryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

impl DeliveryForm {
    /// Name, phone and address are all non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.phone, &self.address]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// Copy with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            notes: self.notes.trim().to_string(),
        }
    }
}

/// Why a cart can't be checked out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Orders can only contain items from one store (your cart has {0} stores)")]
    MultipleStores(usize),
}

/// The single store a cart can be ordered from.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart and
/// `CheckoutError::MultipleStores` when lines span several stores.
pub fn checkout_store(cart: &Cart) -> Result<&StoreId, CheckoutError> {
    match cart.store_ids().as_slice() {
        [] => Err(CheckoutError::EmptyCart),
        [store_id] => Ok(*store_id),
        many => Err(CheckoutError::MultipleStores(many.len())),
    }
}

/// Delivery fee for an order: the store's configured fee when it has one,
/// otherwise `fallback`.
#[must_use]
pub fn delivery_fee(store_fee: Option<Decimal>, fallback: Decimal) -> Decimal {
    store_fee.unwrap_or(fallback)
}

/// Money breakdown shown at checkout and sent with the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub item_count: u64,
}

impl CheckoutSummary {
    #[must_use]
    pub fn new(cart: &Cart, delivery_fee: Decimal) -> Self {
        Self {
            subtotal: cart.total(),
            delivery_fee,
            item_count: cart.item_count(),
        }
    }

    /// `subtotal + delivery fee`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal + self.delivery_fee
    }
}
