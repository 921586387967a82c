//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `AYTS_API_URL` - Marketplace backend base URL (default: <http://localhost:8787>)
//! - `AYTS_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `AYTS_SEARCH_DEBOUNCE_MS` - Product search quiet period (default: 300)
//! - `AYTS_FALLBACK_DELIVERY_FEE` - Delivery fee when a store reports none (default: 50)
//! - `AYTS_VISITOR_IDLE_SECS` - Idle time before a visitor's cart actor is dropped (default: 1800)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Marketplace backend settings
    pub api: ApiConfig,
    /// Shopping session settings
    pub shopping: ShoppingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Marketplace backend configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Cart, search and checkout tuning.
#[derive(Debug, Clone)]
pub struct ShoppingConfig {
    /// Quiet period before a product search hits the backend
    pub search_debounce: Duration,
    /// Delivery fee used when a store has none configured
    pub fallback_delivery_fee: Decimal,
    /// How long an idle visitor's cart actor is kept alive
    pub visitor_idle: Duration,
}

impl Default for ShoppingConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            fallback_delivery_fee: Decimal::from(50),
            visitor_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api: ApiConfig::from_env()?,
            shopping: ShoppingConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    /// Load backend settings on their own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the timeout is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("AYTS_API_URL", "http://localhost:8787");
        let timeout = get_parsed_or_default::<u64>("AYTS_API_TIMEOUT_SECS", "10")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout),
        })
    }
}

impl ShoppingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let debounce_ms = get_parsed_or_default::<u64>("AYTS_SEARCH_DEBOUNCE_MS", "300")?;
        let fallback_delivery_fee =
            get_parsed_or_default::<Decimal>("AYTS_FALLBACK_DELIVERY_FEE", "50")?;
        let idle_secs = get_parsed_or_default::<u64>("AYTS_VISITOR_IDLE_SECS", "1800")?;

        if fallback_delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "AYTS_FALLBACK_DELIVERY_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            search_debounce: Duration::from_millis(debounce_ms),
            fallback_delivery_fee,
            visitor_idle: Duration::from_secs(idle_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed as `T`, with a default value.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
