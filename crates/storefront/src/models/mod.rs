//! Types stored outside the marketplace backend.

pub mod session;

pub use session::keys as session_keys;
