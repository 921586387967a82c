//! AYTS Core - Domain types and the shopping-session state container.
//!
//! This crate provides the pieces of the storefront that don't talk to the
//! network:
//! - `storefront` - Public marketplace site (page views, API client)
//! - `cli` - Command-line tools for migrations and backend status
//!
//! # Architecture
//!
//! The core crate contains types, the cart reducer and the persistence
//! contract - no HTTP clients, no database access. Storage backends plug in
//! through [`persist::KeyValueStore`].
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and statuses
//! - [`location`] - Delivery locations
//! - [`cart`] - Cart lines and the cart collection
//! - [`session`] - State container, actions and the hydration lifecycle
//! - [`persist`] - Key-value bridge and persisted keys
//! - [`checkout`] - Delivery form, single-store rule, totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod location;
pub mod persist;
pub mod session;
pub mod types;

pub use cart::{Cart, CartLineItem, NewLineItem, StoreGroup};
pub use checkout::{CheckoutError, CheckoutSummary, DeliveryForm};
pub use location::Location;
pub use persist::{KeyValueStore, MemoryStore, PersistError, PersistOp};
pub use session::{CartAction, Hydrated, ShoppingState, Snapshot, Unhydrated};
pub use types::*;
