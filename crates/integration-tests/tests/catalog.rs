//! Catalog lookups against the fake backend.

#![allow(clippy::unwrap_used)]

use youshop_core::{Money, ProductId};
use youshop_integration_tests::FakeBackend;
use youshop_storefront::catalog::ProductQuery;

#[tokio::test]
async fn test_list_products_by_category() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let page = shop
        .catalog()
        .list_products(&ProductQuery::in_category("tea"))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.pagination.map(|p| p.total), Some(3));
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_listings_are_cached() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();
    let query = ProductQuery::default().with_limit(2);

    let first = shop.catalog().list_products(&query).await.unwrap();
    let second = shop.catalog().list_products(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.items.len(), 2);
    assert_eq!(backend.state().product_list_calls(), 1);

    shop.catalog().invalidate_all().await;
    shop.catalog().list_products(&query).await.unwrap();
    assert_eq!(backend.state().product_list_calls(), 2);
}

#[tokio::test]
async fn test_search_is_not_cached() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let hits = shop.catalog().search_products("green").await.unwrap();
    shop.catalog().search_products("green").await.unwrap();

    let ids: Vec<&str> = hits.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(backend.state().product_list_calls(), 2);
}

#[tokio::test]
async fn test_get_product_decodes_prices_and_images() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let sencha = shop
        .catalog()
        .get_product(&ProductId::new("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sencha.price, Money::from_cents(1499));
    assert_eq!(sencha.primary_image(), "/img/sencha.jpg");

    let pearls = shop
        .catalog()
        .get_product(&ProductId::new("p3"))
        .await
        .unwrap()
        .unwrap();
    assert!(pearls.is_on_sale());
}

#[tokio::test]
async fn test_unknown_product_is_none() {
    let backend = FakeBackend::start().await;
    let found = backend
        .storefront()
        .catalog()
        .get_product(&ProductId::new("missing"))
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_related_products_share_category() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let related = shop
        .catalog()
        .related_products(&ProductId::new("p1"), 3)
        .await
        .unwrap();

    let ids: Vec<&str> = related.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p3"]);

    let lonely = shop
        .catalog()
        .related_products(&ProductId::new("p4"), 3)
        .await
        .unwrap();
    assert!(lonely.is_empty());
}

#[tokio::test]
async fn test_featured_products_limit() {
    let backend = FakeBackend::start().await;
    let featured = backend
        .storefront()
        .catalog()
        .featured_products(2)
        .await
        .unwrap();
    assert_eq!(featured.len(), 2);
}

#[tokio::test]
async fn test_list_categories() {
    let backend = FakeBackend::start().await;
    let categories = backend.storefront().catalog().list_categories().await.unwrap();

    assert_eq!(categories.len(), 2);
    assert_eq!(categories[1].description.as_deref(), Some("Brewing gear"));
}
