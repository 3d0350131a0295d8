//! Domain types for the YouShop storefront.
//!
//! Type-safe wrappers for IDs, emails and money, plus the catalog, account and
//! order records exchanged with the backend.

pub mod checkout;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod status;
pub mod user;

pub use checkout::{CheckoutData, CheckoutError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use order::{CreateOrderRequest, Order, OrderContact, OrderLine, OrderRecord};
pub use product::{Category, PLACEHOLDER_IMAGE, Product};
pub use status::*;
pub use user::{Address, AddressType, ProfileUpdate, User};
