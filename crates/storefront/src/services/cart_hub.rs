//! One shopping-session actor per visitor.
//!
//! Every visitor's [`ShoppingState`] is owned by a dedicated task. Route
//! handlers talk to it through a [`CartHandle`]; commands are processed one
//! at a time, so two concurrent requests from the same visitor can never both
//! read the cart and then overwrite each other's change.
//!
//! # Lifecycle
//!
//! On spawn the actor starts reading the visitor's persisted entries while it
//! keeps serving its mailbox:
//!
//! - mutations that arrive before the read completes are applied in memory
//!   (see [`ayts_core::Unhydrated`]) and answered immediately;
//! - state reads that arrive before the read completes are parked and
//!   answered right after hydration, so pages always render persisted data.
//!
//! Handles live in a `moka` cache with a time-to-idle and a capacity bound.
//! Eviction only drops the cache's copy: a request still holding a clone keeps
//! the actor running, and a lookup during that window finds the same actor
//! again through a weak sender instead of starting a second one over the same
//! storage. Once the last clone is dropped the actor stops; the next request
//! re-hydrates from storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use ayts_core::session::load_snapshot;
use ayts_core::{CartAction, KeyValueStore, ShoppingState, Unhydrated};

use super::visitor_store::StateBackend;

const MAILBOX_CAPACITY: usize = 32;
const MAX_VISITORS: u64 = 100_000;

/// Errors talking to a visitor's actor.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("cart actor stopped")]
    Stopped,
}

enum Command {
    Dispatch {
        action: CartAction,
        reply: oneshot::Sender<ShoppingState>,
    },
    Snapshot {
        reply: oneshot::Sender<ShoppingState>,
    },
}

/// Address of a visitor's actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CartHandle {
    tx: mpsc::Sender<Command>,
}

impl CartHandle {
    /// Apply an action and return the state after it.
    ///
    /// Once the visitor is hydrated, the change has been written to storage
    /// by the time this returns.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Stopped` if the actor is gone.
    pub async fn dispatch(&self, action: CartAction) -> Result<ShoppingState, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Dispatch { action, reply })
            .await
            .map_err(|_| HubError::Stopped)?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    /// Current state, waiting for hydration if it hasn't finished.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Stopped` if the actor is gone.
    pub async fn state(&self) -> Result<ShoppingState, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| HubError::Stopped)?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Weak addresses of every running actor, by visitor.
type LiveActors = Arc<Mutex<HashMap<Uuid, mpsc::WeakSender<Command>>>>;

/// Registry of visitor actors.
#[derive(Clone)]
pub struct CartHub {
    backend: StateBackend,
    handles: Cache<Uuid, CartHandle>,
    live: LiveActors,
}

impl CartHub {
    #[must_use]
    pub fn new(backend: StateBackend, idle: Duration) -> Self {
        let handles = Cache::builder()
            .max_capacity(MAX_VISITORS)
            .time_to_idle(idle)
            .build();

        Self {
            backend,
            handles,
            live: LiveActors::default(),
        }
    }

    /// The visitor's actor, spawning (and hydrating) it on first use.
    pub async fn handle(&self, visitor: Uuid) -> CartHandle {
        let handle = self.lookup(visitor).await;
        if !handle.is_closed() {
            return handle;
        }

        debug!(%visitor, "Replacing stopped cart actor");
        self.handles.invalidate(&visitor).await;
        self.lookup(visitor).await
    }

    async fn lookup(&self, visitor: Uuid) -> CartHandle {
        self.handles
            .get_with(visitor, async {
                self.revive(visitor).unwrap_or_else(|| self.spawn(visitor))
            })
            .await
    }

    /// An evicted actor that some request still holds.
    fn revive(&self, visitor: Uuid) -> Option<CartHandle> {
        let tx = self.live.lock().ok()?.get(&visitor)?.upgrade()?;
        if tx.is_closed() {
            return None;
        }
        debug!(%visitor, "Reusing evicted cart actor");
        Some(CartHandle { tx })
    }

    fn spawn(&self, visitor: Uuid) -> CartHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        if let Ok(mut live) = self.live.lock() {
            live.insert(visitor, tx.downgrade());
        }

        let store = self.backend.for_visitor(visitor);
        let live = Arc::clone(&self.live);
        tokio::spawn(
            async move {
                run(store, rx).await;
                forget_stopped(&live, visitor);
            }
            .instrument(info_span!("cart_actor", %visitor)),
        );

        CartHandle { tx }
    }

    #[must_use]
    pub const fn backend(&self) -> &StateBackend {
        &self.backend
    }
}

/// Drop the visitor's entry unless it already points at a newer actor.
fn forget_stopped(live: &LiveActors, visitor: Uuid) {
    let Ok(mut live) = live.lock() else {
        return;
    };
    if live
        .get(&visitor)
        .is_some_and(|weak| weak.upgrade().is_none())
    {
        live.remove(&visitor);
    }
}

/// Start an unregistered actor for `store` and return its address.
#[cfg(test)]
fn spawn_actor<S: KeyValueStore>(store: S, visitor: Uuid) -> CartHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    tokio::spawn(run(store, rx).instrument(info_span!("cart_actor", %visitor)));
    CartHandle { tx }
}

async fn run<S: KeyValueStore>(store: S, mut rx: mpsc::Receiver<Command>) {
    let mut early = Unhydrated::new();
    let mut parked: Vec<oneshot::Sender<ShoppingState>> = Vec::new();
    let mut open = true;

    let reading = {
        let store = store.clone();
        async move { load_snapshot(&store).await }
    };
    tokio::pin!(reading);

    let snapshot = loop {
        tokio::select! {
            snapshot = &mut reading => break snapshot,
            command = rx.recv(), if open => match command {
                Some(Command::Dispatch { action, reply }) => {
                    early.dispatch(action);
                    let _ = reply.send(early.state().clone());
                }
                Some(Command::Snapshot { reply }) => parked.push(reply),
                None => open = false,
            },
        }
    };

    let mut container = early.hydrate(snapshot, store).await;
    debug!(
        items = container.state().cart.len(),
        parked = parked.len(),
        "Visitor hydrated"
    );
    for reply in parked {
        let _ = reply.send(container.state().clone());
    }

    if !open {
        return;
    }

    while let Some(command) = rx.recv().await {
        match command {
            Command::Dispatch { action, reply } => {
                container.dispatch(action).await;
                let _ = reply.send(container.state().clone());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(container.state().clone());
            }
        }
    }

    debug!("Cart actor stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tokio::sync::Semaphore;

    use ayts_core::persist::keys;
    use ayts_core::{MemoryStore, NewLineItem, PersistError, ProductId, StoreId};

    use super::*;

    fn item(id: &str, store: &str, price: i64) -> NewLineItem {
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

    /// A store whose reads wait until the test opens the gate.
    #[derive(Clone)]
    struct GatedStore {
        inner: MemoryStore,
        gate: Arc<Semaphore>,
    }

    impl GatedStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gate: Arc::new(Semaphore::new(0)),
            }
        }

        fn open(&self) {
            self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    impl KeyValueStore for GatedStore {
        async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
            let _permit = self.gate.acquire().await.map_err(|_| PersistError::Poisoned)?;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), PersistError> {
            self.inner.remove(key).await
        }
    }

    const PERSISTED_CART: &str = r#"[{"id":"p9","name":"Rice","price":50,"quantity":2,"unit":"kg","image":"","storeId":"s1","storeName":"Store s1"}]"#;

    #[tokio::test]
    async fn test_dispatch_persists_after_hydration() {
        let store = MemoryStore::new();
        let handle = spawn_actor(store.clone(), Uuid::new_v4());

        for _ in 0..3 {
            handle.dispatch(CartAction::Add(item("p1", "s1", 45))).await.unwrap();
        }
        let state = handle.state().await.unwrap();

        assert_eq!(state.cart.item_count(), 3);
        assert_eq!(state.cart.total(), Decimal::from(135));
        assert!(store.peek(keys::CART_ITEMS).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = MemoryStore::new();
        let handle = spawn_actor(store.clone(), Uuid::new_v4());

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle.dispatch(CartAction::Add(item("p1", "s1", 10))).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(handle.state().await.unwrap().cart.item_count(), 20);
    }

    #[tokio::test]
    async fn test_reads_wait_for_hydration() {
        let memory = MemoryStore::new();
        memory
            .set(keys::CART_ITEMS, PERSISTED_CART.to_string())
            .await
            .unwrap();
        let store = GatedStore::new(memory.clone());
        let handle = spawn_actor(store.clone(), Uuid::new_v4());

        let reader = tokio::spawn({
            let handle = handle.clone();
            async move { handle.state().await }
        });
        tokio::task::yield_now().await;
        store.open();

        let state = reader.await.unwrap().unwrap();
        assert_eq!(state.cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_mutation_before_hydration_does_not_clobber() {
        let memory = MemoryStore::new();
        memory
            .set(keys::CART_ITEMS, PERSISTED_CART.to_string())
            .await
            .unwrap();
        let store = GatedStore::new(memory.clone());
        let handle = spawn_actor(store.clone(), Uuid::new_v4());

        // Answered from memory while the read is still blocked.
        let early = handle.dispatch(CartAction::Clear).await.unwrap();
        assert!(early.cart.is_empty());
        assert_eq!(memory.peek(keys::CART_ITEMS).as_deref(), Some(PERSISTED_CART));

        store.open();
        let state = handle.state().await.unwrap();

        assert_eq!(state.cart.item_count(), 2);
        assert!(memory.peek(keys::CART_ITEMS).is_some());
    }

    #[tokio::test]
    async fn test_hub_reuses_actor_per_visitor() {
        let hub = CartHub::new(StateBackend::memory(), Duration::from_secs(60));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        hub.handle(alice)
            .await
            .dispatch(CartAction::Add(item("p1", "s1", 10)))
            .await
            .unwrap();

        let again = hub.handle(alice).await.state().await.unwrap();
        let other = hub.handle(bob).await.state().await.unwrap();

        assert_eq!(again.cart.item_count(), 1);
        assert!(other.cart.is_empty());
    }

    #[tokio::test]
    async fn test_evicted_actor_in_use_is_reused() {
        let hub = CartHub::new(StateBackend::memory(), Duration::from_secs(60));
        let visitor = Uuid::new_v4();

        let in_flight = hub.handle(visitor).await;
        hub.handles.invalidate(&visitor).await;
        hub.handles.run_pending_tasks().await;
        let next = hub.handle(visitor).await;

        assert!(next.tx.same_channel(&in_flight.tx));

        in_flight
            .dispatch(CartAction::Add(item("p1", "s1", 10)))
            .await
            .unwrap();
        next.dispatch(CartAction::Add(item("p1", "s1", 10)))
            .await
            .unwrap();

        assert_eq!(next.state().await.unwrap().cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_stopped_actor_is_forgotten() {
        let hub = CartHub::new(StateBackend::memory(), Duration::from_secs(60));
        let visitor = Uuid::new_v4();

        hub.handle(visitor).await.state().await.unwrap();
        hub.handles.invalidate(&visitor).await;
        hub.handles.run_pending_tasks().await;

        for _ in 0..100 {
            if hub.live.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(hub.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evicted_visitor_rehydrates_from_storage() {
        let hub = CartHub::new(StateBackend::memory(), Duration::from_secs(60));
        let visitor = Uuid::new_v4();

        hub.handle(visitor)
            .await
            .dispatch(CartAction::Add(item("p1", "s1", 10)))
            .await
            .unwrap();
        hub.handles.invalidate(&visitor).await;

        let state = hub.handle(visitor).await.state().await.unwrap();

        assert_eq!(state.cart.item_count(), 1);
    }
}
