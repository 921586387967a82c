//! Server-side debouncing of product searches.
//!
//! The store page's search box fires a request on every keystroke. Each
//! request takes a ticket for its `(visitor, store)` pair and waits out the
//! quiet period; only the holder of the newest ticket goes on to query the
//! backend. An empty query takes a ticket too (cancelling anything pending)
//! but proceeds immediately.
//!
//! A search that already went to the backend can still be overtaken while it
//! waits for the answer, so callers check [`SearchTicket::is_latest`] again
//! before rendering.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use ayts_core::StoreId;

const GENERATION_IDLE: Duration = Duration::from_secs(10 * 60);

/// Outcome of waiting out the quiet period.
#[derive(Debug, Clone)]
pub enum Debounce {
    /// This request is the latest; run the search.
    Proceed(SearchTicket),
    /// A newer request arrived while this one waited.
    Superseded,
}

impl Debounce {
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// A request's place in its `(visitor, store)` sequence.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    counter: Arc<AtomicU64>,
    number: u64,
}

impl SearchTicket {
    /// No newer search has been issued since this one.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.number
    }
}

/// Per-`(visitor, store)` generation counters.
#[derive(Clone)]
pub struct SearchDebouncer {
    quiet: Duration,
    generations: Cache<(Uuid, StoreId), Arc<AtomicU64>>,
}

impl SearchDebouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        let generations = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(GENERATION_IDLE)
            .build();

        Self { quiet, generations }
    }

    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Wait until `query` has been the visitor's latest search for the quiet
    /// period.
    pub async fn settle(&self, visitor: Uuid, store: &StoreId, query: &str) -> Debounce {
        let counter = self
            .generations
            .get_with((visitor, store.clone()), async { Arc::new(AtomicU64::new(0)) })
            .await;
        let number = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = SearchTicket { counter, number };

        if query.trim().is_empty() {
            return Debounce::Proceed(ticket);
        }

        tokio::time::sleep(self.quiet).await;

        if ticket.is_latest() {
            Debounce::Proceed(ticket)
        } else {
            Debounce::Superseded
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn debouncer() -> SearchDebouncer {
        SearchDebouncer::new(Duration::from_millis(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_query_proceeds_after_quiet_period() {
        let debouncer = debouncer();
        let started = tokio::time::Instant::now();

        let outcome = debouncer
            .settle(Uuid::new_v4(), &StoreId::new("s1"), "rice")
            .await;

        assert!(matches!(outcome, Debounce::Proceed(_)));
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_query_supersedes_pending_one() {
        let debouncer = debouncer();
        let visitor = Uuid::new_v4();
        let store = StoreId::new("s1");

        let first = tokio::spawn({
            let debouncer = debouncer.clone();
            let store = store.clone();
            async move { debouncer.settle(visitor, &store, "ri").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = debouncer.settle(visitor, &store, "rice").await;

        assert!(matches!(second, Debounce::Proceed(_)));
        assert!(first.await.unwrap().is_superseded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_cancels_and_proceeds_immediately() {
        let debouncer = debouncer();
        let visitor = Uuid::new_v4();
        let store = StoreId::new("s1");

        let pending = tokio::spawn({
            let debouncer = debouncer.clone();
            let store = store.clone();
            async move { debouncer.settle(visitor, &store, "rice").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = tokio::time::Instant::now();
        let cleared = debouncer.settle(visitor, &store, "  ").await;

        assert!(matches!(cleared, Debounce::Proceed(_)));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(pending.await.unwrap().is_superseded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_search_is_overtaken_by_clear() {
        let debouncer = debouncer();
        let visitor = Uuid::new_v4();
        let store = StoreId::new("s1");

        let Debounce::Proceed(searching) = debouncer.settle(visitor, &store, "rice").await else {
            panic!("single search should proceed");
        };
        assert!(searching.is_latest());

        let Debounce::Proceed(cleared) = debouncer.settle(visitor, &store, "").await else {
            panic!("empty search should proceed");
        };

        assert!(!searching.is_latest());
        assert!(cleared.is_latest());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_stores_are_independent() {
        let debouncer = debouncer();
        let visitor = Uuid::new_v4();

        let first = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.settle(visitor, &StoreId::new("s1"), "rice").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let other = debouncer.settle(visitor, &StoreId::new("s2"), "rice").await;

        assert!(matches!(other, Debounce::Proceed(_)));
        assert!(matches!(first.await.unwrap(), Debounce::Proceed(_)));
    }
}
