//! Shopping-session state container.
//!
//! A visitor's session state (selected location, selected category, cart) is
//! changed only by dispatching [`CartAction`]s through [`ShoppingState::apply`],
//! which mutates memory and returns the writes the change implies.
//!
//! The container has two phases:
//!
//! ```text
//! Unhydrated ──hydrate(snapshot, store)──▶ Hydrated<S>
//! ```
//!
//! [`Unhydrated`] owns no store, so nothing dispatched before the persisted
//! state has been read can overwrite it. [`Unhydrated::hydrate`] consumes the
//! unhydrated container, which makes the transition one-way.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cart::{Cart, CartLineItem, NewLineItem};
use crate::location::Location;
use crate::persist::{KeyValueStore, PersistOp, keys};
use crate::types::{ProductId, StoreId};

/// A change to the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Replace the selected location; `None` clears it.
    SetLocation(Option<Location>),
    /// Replace the selected category; `None` clears it.
    SetCategory(Option<String>),
    /// Add one unit of a product.
    Add(NewLineItem),
    /// Apply a quantity delta to one store's line for a product.
    UpdateQuantity {
        product_id: ProductId,
        store_id: StoreId,
        delta: i64,
    },
    /// Remove a product from every store's lines.
    Remove(ProductId),
    /// Empty the cart.
    Clear,
}

/// Session-scoped shopping state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingState {
    pub location: Option<Location>,
    pub category: Option<String>,
    pub cart: Cart,
}

impl ShoppingState {
    /// Apply an action and return the writes that persist its effect.
    pub fn apply(&mut self, action: CartAction) -> Vec<PersistOp> {
        match action {
            CartAction::SetLocation(location) => {
                self.location = location;
                vec![self.location_op()]
            }
            CartAction::SetCategory(category) => {
                self.category = category;
                vec![self.category_op()]
            }
            CartAction::Add(item) => {
                self.cart.add(item);
                vec![self.cart_op()]
            }
            CartAction::UpdateQuantity {
                product_id,
                store_id,
                delta,
            } => {
                self.cart.update_quantity(&product_id, &store_id, delta);
                vec![self.cart_op()]
            }
            CartAction::Remove(product_id) => {
                self.cart.remove(&product_id);
                vec![self.cart_op()]
            }
            CartAction::Clear => {
                self.cart.clear();
                vec![PersistOp::Delete(keys::CART_ITEMS)]
            }
        }
    }

    fn location_op(&self) -> PersistOp {
        match &self.location {
            Some(location) => encode(keys::SELECTED_LOCATION, location),
            None => PersistOp::Delete(keys::SELECTED_LOCATION),
        }
    }

    fn category_op(&self) -> PersistOp {
        match &self.category {
            Some(category) => encode(keys::SELECTED_CATEGORY, category),
            None => PersistOp::Delete(keys::SELECTED_CATEGORY),
        }
    }

    fn cart_op(&self) -> PersistOp {
        encode(keys::CART_ITEMS, &self.cart)
    }
}

fn encode<T: serde::Serialize + ?Sized>(key: &'static str, value: &T) -> PersistOp {
    match serde_json::to_string(value) {
        Ok(json) => PersistOp::Put(key, json),
        // Serializing plain data structs cannot fail; deleting keeps storage
        // consistent with "absent" if it ever does.
        Err(e) => {
            warn!(key, error = %e, "Failed to encode session entry");
            PersistOp::Delete(key)
        }
    }
}

/// What was found in storage at hydration. `None` means absent, corrupt, or
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub location: Option<Location>,
    pub category: Option<String>,
    pub cart: Option<Cart>,
}

/// Read every persisted entry once.
///
/// Malformed entries and legacy (non-UUID) locations are deleted and reported
/// as absent. Storage errors are logged and treated as absent; they are never
/// returned to the caller.
pub async fn load_snapshot<S: KeyValueStore>(store: &S) -> Snapshot {
    let location = read::<S, Location>(store, keys::SELECTED_LOCATION).await;
    let location = match location {
        Some(location) if location.is_legacy() => {
            debug!(id = %location.id, "Discarding legacy location");
            discard(store, keys::SELECTED_LOCATION).await;
            None
        }
        other => other,
    };

    let category = read::<S, String>(store, keys::SELECTED_CATEGORY).await;
    let cart = read::<S, Vec<CartLineItem>>(store, keys::CART_ITEMS)
        .await
        .map(Cart::from_items);

    Snapshot {
        location,
        category,
        cart,
    }
}

async fn read<S: KeyValueStore, T: DeserializeOwned>(store: &S, key: &'static str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, error = %e, "Failed to read session entry");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding malformed session entry");
            discard(store, key).await;
            None
        }
    }
}

async fn discard<S: KeyValueStore>(store: &S, key: &'static str) {
    if let Err(e) = store.remove(key).await {
        warn!(key, error = %e, "Failed to delete session entry");
    }
}

/// Container before the persisted state has been read.
#[derive(Debug, Clone, Default)]
pub struct Unhydrated {
    state: ShoppingState,
    touched: Touched,
}

#[derive(Debug, Clone, Copy, Default)]
struct Touched {
    location: bool,
    category: bool,
    cart: bool,
}

impl Touched {
    fn mark(&mut self, op: &PersistOp) {
        match op.key() {
            keys::SELECTED_LOCATION => self.location = true,
            keys::SELECTED_CATEGORY => self.category = true,
            keys::CART_ITEMS => self.cart = true,
            _ => {}
        }
    }
}

impl Unhydrated {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &ShoppingState {
        &self.state
    }

    /// Apply an action in memory only.
    pub fn dispatch(&mut self, action: CartAction) {
        for op in self.state.apply(action) {
            self.touched.mark(&op);
        }
    }

    /// Merge the snapshot and attach the store.
    ///
    /// Persisted entries replace in-memory values. Entries absent from
    /// storage that were changed in memory are written through once.
    pub async fn hydrate<S: KeyValueStore>(self, snapshot: Snapshot, store: S) -> Hydrated<S> {
        let Self { mut state, touched } = self;
        let mut pending = Vec::new();

        match snapshot.location {
            Some(location) => state.location = Some(location),
            None if touched.location => pending.push(state.location_op()),
            None => {}
        }
        match snapshot.category {
            Some(category) => state.category = Some(category),
            None if touched.category => pending.push(state.category_op()),
            None => {}
        }
        match snapshot.cart {
            Some(cart) => state.cart = cart,
            None if touched.cart && !state.cart.is_empty() => pending.push(state.cart_op()),
            None => {}
        }

        let hydrated = Hydrated { state, store };
        hydrated.persist(pending).await;
        hydrated
    }
}

/// Container with write-through persistence.
#[derive(Debug, Clone)]
pub struct Hydrated<S> {
    state: ShoppingState,
    store: S,
}

impl<S: KeyValueStore> Hydrated<S> {
    #[must_use]
    pub const fn state(&self) -> &ShoppingState {
        &self.state
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Apply an action and persist its effect before returning.
    pub async fn dispatch(&mut self, action: CartAction) {
        let ops = self.state.apply(action);
        self.persist(ops).await;
    }

    async fn persist(&self, ops: Vec<PersistOp>) {
        if ops.is_empty() {
            return;
        }
        if let Err(e) = self.store.apply(ops).await {
            warn!(error = %e, "Failed to persist session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::tests::product;
    use crate::persist::MemoryStore;

    const UUID: &str = "9a7b3c1d-2e4f-4a6b-8c9d-0e1f2a3b4c5d";

    fn manila() -> Location {
        Location::new(UUID, "Manila", "Metro Manila")
    }

    async fn hydrated(store: &MemoryStore) -> Hydrated<MemoryStore> {
        let snapshot = load_snapshot(store).await;
        Unhydrated::new().hydrate(snapshot, store.clone()).await
    }

    #[tokio::test]
    async fn test_add_three_units_scenario() {
        let store = MemoryStore::new();
        let mut container = hydrated(&store).await;

        for _ in 0..3 {
            container.dispatch(CartAction::Add(product("p1", "s1", 45))).await;
        }

        let cart = &container.state().cart;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total(), Decimal::from(135));
        assert_eq!(cart.item_count(), 3);
        assert!(store.peek(keys::CART_ITEMS).is_some());
    }

    #[tokio::test]
    async fn test_decrement_to_zero_empties_cart() {
        let store = MemoryStore::new();
        let mut container = hydrated(&store).await;
        container.dispatch(CartAction::Add(product("p1", "s1", 45))).await;
        container.dispatch(CartAction::Add(product("p1", "s1", 45))).await;

        container
            .dispatch(CartAction::UpdateQuantity {
                product_id: ProductId::new("p1"),
                store_id: StoreId::new("s1"),
                delta: -2,
            })
            .await;

        assert!(container.state().cart.is_empty());
        assert_eq!(store.peek(keys::CART_ITEMS).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_entry() {
        let store = MemoryStore::new();
        let mut container = hydrated(&store).await;
        container.dispatch(CartAction::Add(product("p1", "s1", 45))).await;

        container.dispatch(CartAction::Clear).await;

        assert_eq!(container.state().cart.item_count(), 0);
        assert_eq!(store.peek(keys::CART_ITEMS), None);
    }

    #[tokio::test]
    async fn test_location_and_category_persist_and_clear() {
        let store = MemoryStore::new();
        let mut container = hydrated(&store).await;

        container.dispatch(CartAction::SetLocation(Some(manila()))).await;
        container
            .dispatch(CartAction::SetCategory(Some("Grocery".to_string())))
            .await;
        assert!(store.peek(keys::SELECTED_LOCATION).is_some());
        assert_eq!(
            store.peek(keys::SELECTED_CATEGORY).as_deref(),
            Some("\"Grocery\"")
        );

        container.dispatch(CartAction::SetLocation(None)).await;
        container.dispatch(CartAction::SetCategory(None)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_hydration_restores_persisted_cart() {
        let store = MemoryStore::new();
        {
            let mut first = hydrated(&store).await;
            first.dispatch(CartAction::SetLocation(Some(manila()))).await;
            first.dispatch(CartAction::Add(product("p1", "s1", 45))).await;
        }

        let second = hydrated(&store).await;

        assert_eq!(second.state().location, Some(manila()));
        assert_eq!(second.state().cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_unhydrated_dispatch_never_writes() {
        let store = MemoryStore::new();
        store
            .set(keys::CART_ITEMS, r#"[{"id":"p9","name":"Rice","price":50,"quantity":2,"unit":"kg","image":"","storeId":"s1","storeName":"Store s1"}]"#.to_string())
            .await
            .ok();
        let before = store.peek(keys::CART_ITEMS);

        let mut container = Unhydrated::new();
        container.dispatch(CartAction::Clear);
        container.dispatch(CartAction::Add(product("p1", "s1", 45)));

        assert_eq!(store.peek(keys::CART_ITEMS), before);
        assert_eq!(container.state().cart.len(), 1);
    }

    #[tokio::test]
    async fn test_hydration_does_not_clobber_persisted_cart() {
        let store = MemoryStore::new();
        {
            let mut first = hydrated(&store).await;
            first.dispatch(CartAction::Add(product("p9", "s1", 50))).await;
            first.dispatch(CartAction::Add(product("p9", "s1", 50))).await;
        }

        let mut early = Unhydrated::new();
        early.dispatch(CartAction::Clear);

        let snapshot = load_snapshot(&store).await;
        let container = early.hydrate(snapshot, store.clone()).await;

        assert_eq!(container.state().cart.item_count(), 2);
        assert!(store.peek(keys::CART_ITEMS).is_some());
    }

    #[tokio::test]
    async fn test_hydration_writes_through_unpersisted_changes() {
        let store = MemoryStore::new();
        let mut early = Unhydrated::new();
        early.dispatch(CartAction::SetCategory(Some("Pharmacy".to_string())));
        early.dispatch(CartAction::Add(product("p1", "s1", 10)));

        let snapshot = load_snapshot(&store).await;
        let container = early.hydrate(snapshot, store.clone()).await;

        assert_eq!(container.state().category.as_deref(), Some("Pharmacy"));
        assert_eq!(
            store.peek(keys::SELECTED_CATEGORY).as_deref(),
            Some("\"Pharmacy\"")
        );
        assert!(store.peek(keys::CART_ITEMS).is_some());
    }

    #[tokio::test]
    async fn test_legacy_location_is_discarded() {
        let store = MemoryStore::new();
        store
            .set(
                keys::SELECTED_LOCATION,
                r#"{"id":"42","name":"Manila","area":"Metro Manila"}"#.to_string(),
            )
            .await
            .ok();

        let container = hydrated(&store).await;

        assert_eq!(container.state().location, None);
        assert_eq!(store.peek(keys::SELECTED_LOCATION), None);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_discarded() {
        let store = MemoryStore::new();
        store.set(keys::CART_ITEMS, "{not json".to_string()).await.ok();
        store
            .set(keys::SELECTED_CATEGORY, "Grocery".to_string())
            .await
            .ok();

        let container = hydrated(&store).await;

        assert!(container.state().cart.is_empty());
        assert_eq!(container.state().category, None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_returns_write_plan() {
        let mut state = ShoppingState::default();

        let ops = state.apply(CartAction::Remove(ProductId::new("p1")));
        assert_eq!(ops, vec![PersistOp::Put(keys::CART_ITEMS, "[]".to_string())]);

        let ops = state.apply(CartAction::Clear);
        assert_eq!(ops, vec![PersistOp::Delete(keys::CART_ITEMS)]);
    }
}
