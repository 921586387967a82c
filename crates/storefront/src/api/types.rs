//! Wire types for the marketplace backend.
//!
//! Field names follow the backend's camelCase JSON. Money fields accept both
//! JSON numbers and decimal strings; order requests send plain numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ayts_core::{
    CategoryId, Location, LocationId, NewLineItem, OrderId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, StoreId,
};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub pagination: Option<Pagination>,
}

/// Page metadata on list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
}

/// A delivery location as the backend describes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    pub postal_code: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiLocation {
    /// The selectable form: area is `"{city}, {province}"`.
    #[must_use]
    pub fn to_location(&self) -> Location {
        let area = match (self.city.is_empty(), self.province.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.province),
            (false, true) => self.city.clone(),
            (true, false) => self.province.clone(),
            (true, true) => String::new(),
        };
        Location::new(self.id.clone(), self.name.clone(), area)
    }
}

/// A store category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// A vendor's store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    pub category_id: Option<CategoryId>,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub delivery_fee: Option<Decimal>,
    #[serde(default)]
    pub minimum_order_amount: Option<Decimal>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    pub category: Option<Category>,
}

impl Store {
    /// Category name, when the backend embedded it.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|category| category.name.as_str())
    }
}

/// A product sold by one store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub unit: Option<String>,
    #[serde(default)]
    pub inventory_count: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    pub store: Option<Box<Store>>,
}

impl Product {
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.inventory_count > 0
    }

    /// The cart line this product adds, sold by the store named `store_name`.
    #[must_use]
    pub fn to_line_item(&self, store_name: &str) -> NewLineItem {
        NewLineItem {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            unit: self.unit.clone().unwrap_or_default(),
            image: self.image().unwrap_or_default().to_string(),
            store_id: self.store_id.clone(),
            store_name: store_name.to_string(),
        }
    }
}

/// `data` of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    pub pagination: Option<Pagination>,
}

/// Filters for `GET /api/stores`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Filters for `GET /api/products`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// One line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub store_id: StoreId,
    pub delivery_address: String,
    pub delivery_instructions: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub order_notes: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: String,
    pub store_id: StoreId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub order_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub store: Option<Box<Store>>,
}

impl Order {
    /// Order number for display, falling back to the id.
    #[must_use]
    pub fn reference(&self) -> &str {
        if self.order_number.is_empty() {
            self.id.as_str()
        } else {
            &self.order_number
        }
    }
}

/// A line of a placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub total_price: Decimal,
}

const fn active() -> bool {
    true
}
