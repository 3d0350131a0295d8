//! Catalog browsing commands.

use youshop_core::{Product, ProductId};
use youshop_storefront::Storefront;
use youshop_storefront::catalog::ProductQuery;

use super::CliError;

const RELATED_LIMIT: usize = 3;

fn print_product_row(product: &Product) {
    let stock = if product.in_stock { "" } else { "  (out of stock)" };
    let sale = if product.is_on_sale() { "  SALE" } else { "" };
    println!(
        "{:<24} {:<40} {:>10}{sale}{stock}",
        product.id.as_str(),
        product.name,
        product.price.to_string()
    );
}

/// List products.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn list(shop: &Storefront, query: &ProductQuery) -> Result<(), Box<dyn std::error::Error>> {
    let page = shop.catalog().list_products(query).await?;

    if page.items.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in &page.items {
        print_product_row(product);
    }
    if let Some(p) = page.pagination {
        println!();
        println!("Page {} of {} ({} products)", p.page, p.total_pages, p.total);
    }
    Ok(())
}

/// Show one product and a few related ones.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
pub async fn show(shop: &Storefront, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    let product = shop
        .catalog()
        .get_product(&id)
        .await?
        .ok_or_else(|| CliError::ProductNotFound(id.clone()))?;

    println!("{}", product.name);
    println!("  Price     {}", product.price);
    if let Some(original) = product.original_price.filter(|_| product.is_on_sale()) {
        println!("  Was       {original}");
    }
    if let Some(category) = &product.category {
        println!("  Category  {}", category.name);
    }
    println!("  Rating    {:.1} ({} reviews)", product.rating, product.reviews);
    println!("  In stock  {}", if product.in_stock { "yes" } else { "no" });
    println!("  Image     {}", product.primary_image());
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }

    let related = shop.catalog().related_products(&id, RELATED_LIMIT).await?;
    if !related.is_empty() {
        println!();
        println!("Related:");
        for product in &related {
            print_product_row(product);
        }
    }
    Ok(())
}

/// Search products.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn search(shop: &Storefront, term: &str) -> Result<(), Box<dyn std::error::Error>> {
    let products = shop.catalog().search_products(term).await?;

    if products.is_empty() {
        println!("No products match \"{term}\".");
    }
    for product in &products {
        print_product_row(product);
    }
    Ok(())
}

/// List categories.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn categories(shop: &Storefront) -> Result<(), Box<dyn std::error::Error>> {
    for category in shop.catalog().list_categories().await? {
        match &category.description {
            Some(description) => println!("{:<24} {}  {description}", category.id.as_str(), category.name),
            None => println!("{:<24} {}", category.id.as_str(), category.name),
        }
    }
    Ok(())
}
