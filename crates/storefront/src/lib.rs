//! `YouShop` storefront client core.
//!
//! Talks to the `YouShop` REST backend and keeps the client-side state a
//! storefront needs: credentials, the signed-in session, the cart, and
//! orders that could not be submitted. Build everything through
//! [`Storefront::start`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orders;
pub mod session;
pub mod state;
pub mod storage;
pub mod tokens;

pub use error::StorefrontError;
pub use state::Storefront;
