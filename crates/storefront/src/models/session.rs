//! Session-related types.
//!
//! The tower session only identifies the visitor; shopping state lives in
//! `storefront.visitor_state` under the visitor id.

/// Session keys.
pub mod keys {
    /// Key for the visitor's UUID.
    pub const VISITOR_ID: &str = "visitor_id";

    /// Key for the marketplace bearer token.
    pub const AUTH_TOKEN: &str = ayts_core::persist::keys::AUTH_TOKEN;
}
