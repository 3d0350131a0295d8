//! Checkout and order history commands.

use clap::Args;
use secrecy::SecretString;
use youshop_core::{CheckoutData, Order, OrderId, OrderRecord, OrderTotals};
use youshop_storefront::Storefront;

use super::{CliError, print_totals};

/// Checkout form fields.
#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    email: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    phone: String,

    /// Street address
    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    zip_code: String,

    #[arg(long)]
    country: String,

    #[arg(long)]
    card_number: String,

    /// Card expiry as MM/YY
    #[arg(long)]
    card_expiry: String,

    #[arg(long)]
    card_cvc: String,
}

impl From<CheckoutArgs> for CheckoutData {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
            address: args.address,
            city: args.city,
            state: args.state,
            zip_code: args.zip_code,
            country: args.country,
            card_number: SecretString::from(args.card_number),
            card_expiry: SecretString::from(args.card_expiry),
            card_cvc: SecretString::from(args.card_cvc),
        }
    }
}

fn source_label(record: &OrderRecord) -> &'static str {
    if record.is_local() { "local" } else { "confirmed" }
}

fn print_order_row(record: &OrderRecord) {
    let order = record.order();
    println!(
        "{:<44} {:<10} {:<10} {:>4} item(s) {:>10}  {}",
        order.id.as_str(),
        source_label(record),
        order.status.to_string(),
        order.item_count(),
        order.total.to_string(),
        order.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_order(record: &OrderRecord) {
    let order: &Order = record.order();
    match &order.order_number {
        Some(number) => println!("Order {number} ({})", order.id),
        None => println!("Order {}", order.id),
    }
    println!("  Source    {}", source_label(record));
    println!("  Status    {}", order.status);
    println!("  Placed    {}", order.created_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(eta) = order.estimated_delivery {
        println!("  Arrives   {}", eta.format("%Y-%m-%d"));
    }
    if let Some(tracking) = &order.tracking_number {
        println!("  Tracking  {tracking}");
    }
    println!();
    for line in &order.items {
        let name = line
            .product
            .as_ref()
            .map_or_else(|| line.product_id.as_str(), |p| p.name.as_str());
        println!(
            "  {:<32} {:>4} x {:>9} = {:>10}",
            name,
            line.quantity,
            line.unit_price.to_string(),
            line.total_price.to_string()
        );
    }
    println!();
    print_totals(&OrderTotals {
        subtotal: order.subtotal,
        tax: order.tax,
        shipping: order.shipping,
        total: order.total,
    });
}

/// Place an order for the cart.
///
/// # Errors
///
/// Returns an error if the cart is empty or the form is incomplete.
pub async fn checkout(shop: &Storefront, args: CheckoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let submission = shop.checkout(&args.into()).await?;

    if let Some(e) = &submission.remote_error {
        println!("The order could not be sent to the store ({e}).");
        println!("It has been saved on this device; retry with:");
        println!("  ys orders resubmit {}", submission.record.id());
        println!();
    } else {
        println!("Thank you! Your order has been placed.");
        println!();
    }
    print_order(&submission.record);
    Ok(())
}

/// List orders.
///
/// # Errors
///
/// Returns an error if local orders cannot be read.
pub async fn list(shop: &Storefront) -> Result<(), Box<dyn std::error::Error>> {
    let orders = shop.orders().get_orders().await?;
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for record in &orders {
        print_order_row(record);
    }
    Ok(())
}

/// Show one order.
///
/// # Errors
///
/// Returns an error if the order does not exist or cannot be loaded.
pub async fn show(shop: &Storefront, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let record = shop
        .orders()
        .get_order(&OrderId::new(id))
        .await?
        .ok_or_else(|| CliError::OrderNotFound(id.to_string()))?;
    print_order(&record);
    Ok(())
}

/// Cancel an order.
///
/// # Errors
///
/// Returns an error if the order cannot be cancelled.
pub async fn cancel(shop: &Storefront, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let record = shop.orders().cancel_order(&OrderId::new(id)).await?;
    println!("Order {} is now {}.", record.id(), record.order().status);
    Ok(())
}

/// Resubmit a local order.
///
/// # Errors
///
/// Returns an error if the order is not local or the backend still fails.
pub async fn resubmit(shop: &Storefront, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let record = shop.orders().resubmit_local_order(&OrderId::new(id)).await?;
    println!("Order {id} was accepted by the store as {}.", record.id());
    Ok(())
}
