//! YouShop Core - Shared domain types for the storefront client.
//!
//! This crate provides the types and pure rules used by every YouShop
//! component:
//! - `storefront` - API access, session, cart and order services
//! - `cli` - Command-line front-end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows the cart and
//! pricing rules to be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, statuses and the
//!   catalog/user/order records exchanged with the backend
//! - [`cart`] - The in-progress order and its line invariants
//! - [`pricing`] - Subtotal, tax, shipping and total formulas

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pricing;
pub mod types;

pub use cart::{Cart, CartError, CartLine, ProductSnapshot};
pub use pricing::OrderTotals;
pub use types::*;
