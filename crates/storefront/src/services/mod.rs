//! Per-visitor services behind the route handlers.
//!
//! # Services
//!
//! - `visitor_store` - Where a visitor's persisted entries live (`PostgreSQL` or memory)
//! - `cart_hub` - One actor per visitor owning the shopping-session container
//! - `search` - Server-side debouncing of product searches

pub mod cart_hub;
pub mod search;
pub mod visitor_store;

pub use cart_hub::{CartHandle, CartHub, HubError};
pub use search::{Debounce, SearchDebouncer, SearchTicket};
pub use visitor_store::{StateBackend, VisitorStore};
