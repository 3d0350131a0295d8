//! Cart commands.

use youshop_core::ProductId;
use youshop_storefront::Storefront;

use super::{CliError, print_totals};

/// Print cart lines and totals.
pub fn show(shop: &Storefront) {
    let cart = shop.cart().snapshot();
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.lines() {
        println!(
            "{:<24} {:<32} {:>4} x {:>9} = {:>10}",
            line.product_id.as_str(),
            line.product.name,
            line.quantity,
            line.unit_price.to_string(),
            line.line_total().to_string()
        );
    }
    println!();
    println!("{} item(s)", cart.item_count());
    print_totals(&cart.totals());
}

/// Add a product by id.
///
/// # Errors
///
/// Returns an error if the product does not exist, the quantity is invalid,
/// or the catalog request fails.
pub async fn add(
    shop: &Storefront,
    product_id: &str,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(product_id);
    let product = shop
        .catalog()
        .get_product(&id)
        .await?
        .ok_or(CliError::ProductNotFound(id))?;

    shop.cart().add_item(&product, quantity)?;
    println!("Added {quantity} x {} to your cart.", product.name);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the quantity overflows.
pub fn update(
    shop: &Storefront,
    product_id: &str,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(product_id);
    if shop.cart().snapshot().line(&id).is_none() {
        println!("{id} is not in your cart.");
        return Ok(());
    }

    shop.cart().update_quantity(&id, quantity)?;
    if quantity <= 0 {
        println!("Removed {id} from your cart.");
    } else {
        println!("Updated {id} to {quantity}.");
    }
    Ok(())
}

pub fn remove(shop: &Storefront, product_id: &str) {
    let id = ProductId::new(product_id);
    shop.cart().remove_item(&id);
    println!("Removed {id} from your cart.");
}

pub fn clear(shop: &Storefront) {
    shop.cart().clear();
    println!("Cart cleared.");
}
