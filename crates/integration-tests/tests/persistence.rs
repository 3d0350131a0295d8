//! State surviving a restart through file-backed storage.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use youshop_core::ProductId;
use youshop_integration_tests::{FakeBackend, PASSWORD, checkout_data};
use youshop_storefront::Storefront;

#[tokio::test]
async fn test_cart_session_and_local_orders_survive_restart() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = backend.config().with_storage_dir(dir.path());

    let local_id = {
        let shop = Storefront::start(config.clone()).await.unwrap();
        assert!(!shop.session().is_authenticated());

        shop.session()
            .login("sam@example.com", &SecretString::from(PASSWORD.to_string()))
            .await
            .unwrap();
        let tea = shop
            .catalog()
            .get_product(&ProductId::new("p2"))
            .await
            .unwrap()
            .unwrap();
        shop.cart().add_item(&tea, 1).unwrap();

        backend.state().fail_orders(true);
        let local = shop.checkout(&checkout_data()).await.unwrap().record;

        shop.cart().add_item(&tea, 4).unwrap();
        local.id().clone()
    };

    let shop = Storefront::start(config).await.unwrap();

    assert!(shop.session().is_authenticated());
    assert_eq!(shop.cart().item_count(), 4);
    let local = shop.orders().local_orders().unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, local_id);
}

#[tokio::test]
async fn test_logout_forgets_credentials_on_disk() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = backend.config().with_storage_dir(dir.path());

    {
        let shop = Storefront::start(config.clone()).await.unwrap();
        shop.session()
            .login("sam@example.com", &SecretString::from(PASSWORD.to_string()))
            .await
            .unwrap();
        shop.session().logout().await;
    }

    let shop = Storefront::start(config).await.unwrap();
    assert!(!shop.session().is_authenticated());
    assert!(!shop.api().tokens().has_access_token());
}
