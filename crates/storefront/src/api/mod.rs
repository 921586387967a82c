//! Marketplace backend REST client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`, one attempt per call
//! - Every response is wrapped in an [`types::Envelope`]
//! - No caching: the backend is the source of truth for catalog and orders
//! - A visitor's bearer token is attached with [`ApiClient::authorized`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ayts_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let locations = client.locations().await?;
//! let store = client.store(&store_id).await?;
//! ```

mod maintenance;
pub mod types;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use ayts_core::{OrderId, ProductId, StoreId};

use crate::config::ApiConfig;

pub use maintenance::MaintenanceStatus;
pub use types::{
    ApiLocation, Category, Envelope, NewOrder, Order, OrderItem, OrderLine, Pagination, Product,
    ProductPage, ProductQuery, Store, StoreQuery,
};

/// Errors that can occur when calling the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The backend answered 2xx with `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A successful envelope carried no `data`.
    #[error("Response contained no data")]
    MissingData,

    /// The configured base URL can't carry a path.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The backend rejected the bearer token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace backend.
///
/// Cheap to clone. A clone made with [`ApiClient::authorized`] shares the
/// connection pool but carries its own token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
    token: Option<SecretString>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the base URL doesn't parse, or
    /// `ApiError::Http` if the HTTP client can't be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
            token: None,
        })
    }

    /// A view of this client that sends `Authorization: Bearer <token>`.
    #[must_use]
    pub fn authorized(&self, token: Option<SecretString>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// `GET /api/stores/locations`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self))]
    pub async fn locations(&self) -> Result<Vec<ApiLocation>, ApiError> {
        self.data(self.request(Method::GET, &["api", "stores", "locations"])?)
            .await
    }

    /// `GET /api/stores/categories`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.data(self.request(Method::GET, &["api", "stores", "categories"])?)
            .await
    }

    /// `GET /api/stores` with filters.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self))]
    pub async fn stores(&self, query: &StoreQuery) -> Result<Vec<Store>, ApiError> {
        let request = self.request(Method::GET, &["api", "stores"])?.query(query);
        self.data(request).await
    }

    /// `GET /api/stores/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn store(&self, id: &StoreId) -> Result<Store, ApiError> {
        self.data(self.request(Method::GET, &["api", "stores", id.as_str()])?)
            .await
    }

    /// `GET /api/products` with filters.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let request = self.request(Method::GET, &["api", "products"])?.query(query);
        self.data(request).await
    }

    /// `GET /api/products/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.data(self.request(Method::GET, &["api", "products", id.as_str()])?)
            .await
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// `POST /api/orders`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails, the backend rejects the order,
    /// or the response carries no order.
    #[instrument(skip(self, order), fields(store_id = %order.store_id, items = order.items.len()))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        let request = self.request(Method::POST, &["api", "orders"])?.json(order);
        self.data(request).await
    }

    /// `GET /api/orders/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.data(self.request(Method::GET, &["api", "orders", id.as_str()])?)
            .await
    }

    /// `PUT /api/orders/{id}/cancel`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend refuses to cancel.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let request = self.request(Method::PUT, &["api", "orders", id.as_str(), "cancel"])?;
        self.data(request).await
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let request = self.inner.client.request(method, url);
        Ok(match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        })
    }

    /// Send a request and unwrap the envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error.or(envelope.message))
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            warn!(status = %status, message = %message, "Backend returned non-success status");
            return Err(ApiError::Status { status, message });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })?;

        if !envelope.success {
            let message = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "Request failed".to_string());
            debug!(message = %message, "Backend rejected request");
            return Err(ApiError::Rejected(message));
        }

        Ok(envelope)
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request).await?.data.ok_or(ApiError::MissingData)
    }
}
