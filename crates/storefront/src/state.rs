//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::services::{CartHub, SearchDebouncer, StateBackend};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and the visitor actors.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    carts: CartHub,
    search: SearchDebouncer,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `backend` - Where visitor entries are persisted
    ///
    /// # Errors
    ///
    /// Returns an error if the backend API client can't be built.
    pub fn new(config: StorefrontConfig, backend: StateBackend) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let carts = CartHub::new(backend, config.shopping.visitor_idle);
        let search = SearchDebouncer::new(config.shopping.search_debounce);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                carts,
                search,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the anonymous marketplace API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the visitor actor registry.
    #[must_use]
    pub fn carts(&self) -> &CartHub {
        &self.inner.carts
    }

    /// Get a reference to the product search debouncer.
    #[must_use]
    pub fn search(&self) -> &SearchDebouncer {
        &self.inner.search
    }

    /// Get a reference to the visitor-state backend.
    #[must_use]
    pub fn backend(&self) -> &StateBackend {
        self.inner.carts.backend()
    }
}
