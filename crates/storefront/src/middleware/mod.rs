//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame options, etc.)
//! 5. Session layer (tower-sessions)
//!
//! Extractors:
//!
//! - [`Visitor`] - the visitor id, cart actor and hydrated state
//! - [`RequireLocation`] - a visitor who has picked a delivery location

pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod visitor;

pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
pub use visitor::{RequireLocation, Visitor};
