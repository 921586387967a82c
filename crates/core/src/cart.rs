//! Cart line items and the in-memory cart collection.
//!
//! A line is identified by the pair `(product id, store id)`: the same product
//! sold by two stores occupies two lines. Every line present in a [`Cart`] has
//! a quantity of at least one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, StoreId};

/// One product from one store, with an aggregate quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub image: String,
    pub store_id: StoreId,
    pub store_name: String,
}

impl CartLineItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    fn is(&self, id: &ProductId, store_id: &StoreId) -> bool {
        &self.id == id && &self.store_id == store_id
    }
}

/// A line item as submitted by "add to cart", before it has a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub unit: String,
    pub image: String,
    pub store_id: StoreId,
    pub store_name: String,
}

impl NewLineItem {
    fn with_quantity(self, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: self.id,
            name: self.name,
            price: self.price,
            quantity,
            unit: self.unit,
            image: self.image,
            store_id: self.store_id,
            store_name: self.store_name,
        }
    }
}

/// Lines belonging to a single store, for per-store display at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGroup<'a> {
    pub store_id: &'a StoreId,
    pub store_name: &'a str,
    pub items: Vec<&'a CartLineItem>,
}

impl StoreGroup<'_> {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(|item| item.line_total()).sum()
    }
}

/// Ordered collection of cart lines (insertion order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from persisted lines, dropping any with a zero quantity.
    #[must_use]
    pub fn from_items(mut items: Vec<CartLineItem>) -> Self {
        items.retain(|item| item.quantity > 0);
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add one unit of a product.
    ///
    /// Increments the matching `(id, store_id)` line by exactly one, or
    /// appends a new line with quantity one.
    pub fn add(&mut self, item: NewLineItem) {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.is(&item.id, &item.store_id))
        {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.items.push(item.with_quantity(1));
        }
    }

    /// Apply `delta` to the quantity of the `(id, store_id)` line.
    ///
    /// A line whose quantity ends up at or below zero is removed. Unknown
    /// lines are ignored.
    pub fn update_quantity(&mut self, id: &ProductId, store_id: &StoreId, delta: i64) {
        self.items.retain_mut(|line| {
            if !line.is(id, store_id) {
                return true;
            }
            let next = i64::from(line.quantity).saturating_add(delta);
            if next <= 0 {
                return false;
            }
            line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
            true
        });
    }

    /// Remove every line for `id`, across all stores.
    pub fn remove(&mut self, id: &ProductId) {
        self.items.retain(|line| &line.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Sum of quantities (units, not lines).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Quantity of the `(id, store_id)` line, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId, store_id: &StoreId) -> u32 {
        self.items
            .iter()
            .find(|line| line.is(id, store_id))
            .map_or(0, |line| line.quantity)
    }

    /// Distinct store ids in first-appearance order.
    #[must_use]
    pub fn store_ids(&self) -> Vec<&StoreId> {
        let mut ids: Vec<&StoreId> = Vec::new();
        for line in &self.items {
            if !ids.contains(&&line.store_id) {
                ids.push(&line.store_id);
            }
        }
        ids
    }

    /// Group lines by store, stores in first-appearance order.
    #[must_use]
    pub fn by_store(&self) -> Vec<StoreGroup<'_>> {
        let mut groups: Vec<StoreGroup<'_>> = Vec::new();
        for line in &self.items {
            match groups.iter_mut().find(|g| g.store_id == &line.store_id) {
                Some(group) => group.items.push(line),
                None => groups.push(StoreGroup {
                    store_id: &line.store_id,
                    store_name: &line.store_name,
                    items: vec![line],
                }),
            }
        }
        groups
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, store: &str, price: i64) -> NewLineItem {
        NewLineItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            unit: "pc".to_string(),
            image: String::new(),
            store_id: StoreId::new(store),
            store_name: format!("Store {store}"),
        }
    }

    #[test]
    fn test_add_three_times_is_one_line() {
        let mut cart = Cart::new();
        for _ in 0..3 {
            cart.add(product("p1", "s1", 45));
        }

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&ProductId::new("p1"), &StoreId::new("s1")), 3);
        assert_eq!(cart.total(), Decimal::from(135));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_same_product_different_store_is_separate_line() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 10));
        cart.add(product("p1", "s2", 12));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total(), Decimal::from(22));
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 45));
        cart.add(product("p1", "s1", 45));

        cart.update_quantity(&ProductId::new("p1"), &StoreId::new("s1"), -2);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_below_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 45));

        cart.update_quantity(&ProductId::new("p1"), &StoreId::new("s1"), -10);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_is_scoped_to_store() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 10));
        cart.add(product("p1", "s2", 10));

        cart.update_quantity(&ProductId::new("p1"), &StoreId::new("s2"), 4);

        assert_eq!(cart.quantity_of(&ProductId::new("p1"), &StoreId::new("s1")), 1);
        assert_eq!(cart.quantity_of(&ProductId::new("p1"), &StoreId::new("s2")), 5);
    }

    #[test]
    fn test_update_unknown_line_is_noop() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 10));
        let before = cart.clone();

        cart.update_quantity(&ProductId::new("p9"), &StoreId::new("s1"), 1);

        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_spans_stores() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 10));
        cart.add(product("p1", "s2", 10));
        cart.add(product("p2", "s1", 10));

        cart.remove(&ProductId::new("p1"));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].id, ProductId::new("p2"));
    }

    #[test]
    fn test_by_store_keeps_first_appearance_order() {
        let mut cart = Cart::new();
        cart.add(product("a", "s2", 1));
        cart.add(product("b", "s1", 2));
        cart.add(product("c", "s2", 3));

        let groups = cart.by_store();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].store_id.as_str(), "s2");
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].subtotal(), Decimal::from(4));
        assert_eq!(groups[1].store_id.as_str(), "s1");
        assert_eq!(cart.store_ids().len(), 2);
    }

    #[test]
    fn test_persisted_shape_is_camel_case_with_numeric_price() {
        let mut cart = Cart::new();
        cart.add(product("p1", "s1", 45));

        let json = serde_json::to_value(&cart).unwrap_or_default();
        let line = &json[0];
        assert_eq!(line["storeId"], "s1");
        assert_eq!(line["storeName"], "Store s1");
        assert_eq!(line["quantity"], 1);
        assert!(line["price"].is_number());
    }

    #[test]
    fn test_from_items_drops_zero_quantities() {
        let line = product("p1", "s1", 5).with_quantity(0);
        let kept = product("p2", "s1", 5).with_quantity(2);

        let cart = Cart::from_items(vec![line, kept]);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 2);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(usize, usize),
            Update(usize, usize, i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4usize, 0..2usize).prop_map(|(p, s)| Op::Add(p, s)),
                (0..4usize, 0..2usize, -3..4i64).prop_map(|(p, s, d)| Op::Update(p, s, d)),
            ]
        }

        proptest! {
            #[test]
            fn total_matches_lines(ops in proptest::collection::vec(op(), 0..40)) {
                let mut cart = Cart::new();
                for op in ops {
                    match op {
                        Op::Add(p, s) => cart.add(product(&format!("p{p}"), &format!("s{s}"), (p as i64 + 1) * 5)),
                        Op::Update(p, s, d) => cart.update_quantity(
                            &ProductId::new(format!("p{p}")),
                            &StoreId::new(format!("s{s}")),
                            d,
                        ),
                    }
                }

                let expected: Decimal = cart
                    .items()
                    .iter()
                    .map(|l| l.price * Decimal::from(l.quantity))
                    .sum();
                prop_assert_eq!(cart.total(), expected);
                prop_assert!(cart.items().iter().all(|l| l.quantity >= 1));
            }
        }
    }
}
