//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use secrecy::SecretString;
use thiserror::Error;
use youshop_core::{OrderTotals, ProductId};

pub use orders::CheckoutArgs;

/// Environment variable read when `--password` is not given.
const PASSWORD_ENV: &str = "YOUSHOP_PASSWORD";

/// Errors raised by the CLI itself rather than the storefront.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("password required: pass --password or set YOUSHOP_PASSWORD")]
    MissingPassword,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("order {0} not found")]
    OrderNotFound(String),
}

/// Password from the flag, else the environment.
fn password(flag: Option<String>) -> Result<SecretString, CliError> {
    flag.or_else(|| std::env::var(PASSWORD_ENV).ok())
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
        .ok_or(CliError::MissingPassword)
}

fn print_totals(totals: &OrderTotals) {
    println!("  Subtotal  {:>10}", totals.subtotal.to_string());
    println!("  Tax       {:>10}", totals.tax.to_string());
    let shipping = if totals.ships_free() {
        "FREE".to_string()
    } else {
        totals.shipping.to_string()
    };
    println!("  Shipping  {shipping:>10}");
    println!("  Total     {:>10}", totals.total.to_string());
}
