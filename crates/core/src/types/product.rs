//! Catalog records: products and categories.
//!
//! Deserialization is lenient about optional presentation fields so a
//! partially populated catalog entry never fails the whole listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};
use super::money::Money;

/// Image shown when a product has none.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// The image to show for this product.
    ///
    /// Prefers the first gallery image. Some backends serialize array columns
    /// as `{url}`, so a single stray leading `{` or trailing `}` is stripped.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        if let Some(first) = self.images.first() {
            let trimmed = first.strip_prefix('{').unwrap_or(first);
            let trimmed = trimmed.strip_suffix('}').unwrap_or(trimmed);
            if !trimmed.is_empty() {
                return trimmed;
            }
        }

        self.image
            .as_deref()
            .filter(|image| !image.is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// The category this product belongs to, from either the embedded
    /// category or the bare `categoryId` field.
    #[must_use]
    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id
            .as_ref()
            .or_else(|| self.category.as_ref().map(|c| &c.id))
    }

    /// Returns true if the product is discounted from an original price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_json(images: &str, image: &str) -> String {
        format!(
            r#"{{"id":"p1","name":"Mug","price":"12.50","images":{images},"image":{image}}}"#
        )
    }

    #[test]
    fn test_deserialize_minimal_product() {
        let product: Product =
            serde_json::from_str(&product_json("[]", "null")).expect("deserialize");
        assert_eq!(product.id, ProductId::new("p1"));
        assert_eq!(product.price, Money::from_cents(1250));
        assert!(product.in_stock);
        assert_eq!(product.primary_image(), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_primary_image_strips_braces() {
        let product: Product =
            serde_json::from_str(&product_json(r#"["{/img/a.png}"]"#, r#""/img/b.png""#))
                .expect("deserialize");
        assert_eq!(product.primary_image(), "/img/a.png");
    }

    #[test]
    fn test_primary_image_falls_back_to_image() {
        let product: Product =
            serde_json::from_str(&product_json("[]", r#""/img/b.png""#)).expect("deserialize");
        assert_eq!(product.primary_image(), "/img/b.png");
    }

    #[test]
    fn test_category_id_from_embedded_category() {
        let json = r#"{"id":"p1","name":"Mug","price":5,"category":{"id":"c9","name":"Kitchen"}}"#;
        let product: Product = serde_json::from_str(json).expect("deserialize");
        assert_eq!(product.category_id(), Some(&CategoryId::new("c9")));
    }

    #[test]
    fn test_is_on_sale() {
        let json = r#"{"id":"p1","name":"Mug","price":5,"originalPrice":"7.5"}"#;
        let product: Product = serde_json::from_str(json).expect("deserialize");
        assert!(product.is_on_sale());
    }
}
