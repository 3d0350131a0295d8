//! Session lifecycle against the fake backend.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use youshop_core::ProfileUpdate;
use youshop_integration_tests::{FakeBackend, PASSWORD, TAKEN_EMAIL};
use youshop_storefront::api::ErrorKind;
use youshop_storefront::session::{AuthError, AuthState};

fn password(p: &str) -> SecretString {
    SecretString::from(p.to_string())
}

#[tokio::test]
async fn test_login_stores_tokens() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let user = shop
        .session()
        .login("sam@example.com", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(user.first_name, "Sam");
    assert!(shop.session().is_authenticated());
    assert!(shop.api().tokens().has_access_token());
    assert!(!shop.session().snapshot().is_loading);
}

#[tokio::test]
async fn test_wrong_password_never_refreshes() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront_with(backend.stale_session_store());

    let err = shop
        .session()
        .login("sam@example.com", &password("hunter2"))
        .await
        .unwrap_err();

    let AuthError::Api(api_err) = err else {
        panic!("expected an API error, got {err:?}");
    };
    assert_eq!(api_err.kind, ErrorKind::Authentication);
    assert_eq!(api_err.message, "Invalid credentials");
    assert_eq!(backend.state().refresh_calls(), 0);
    assert!(!shop.session().is_authenticated());
    assert_eq!(
        shop.session().snapshot().error.as_deref(),
        Some("Invalid credentials")
    );
}

#[tokio::test]
async fn test_failed_relogin_keeps_signed_in_user() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();
    let user = shop
        .session()
        .login("sam@example.com", &password(PASSWORD))
        .await
        .unwrap();

    shop.session()
        .login("sam@example.com", &password("hunter2"))
        .await
        .unwrap_err();

    assert_eq!(shop.session().current_user(), Some(user));
    assert!(shop.api().tokens().has_access_token());
    assert_eq!(
        shop.session().snapshot().error.as_deref(),
        Some("Invalid credentials")
    );
}

#[tokio::test]
async fn test_register_validation_messages_joined() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let err = shop
        .session()
        .register("Tess", "Ng", TAKEN_EMAIL, &password(PASSWORD))
        .await
        .unwrap_err();

    let AuthError::Api(api_err) = err else {
        panic!("expected an API error, got {err:?}");
    };
    assert_eq!(api_err.status_code, 400);
    assert_eq!(api_err.kind, ErrorKind::Validation);
    assert_eq!(api_err.message, "email must be unique, password is too weak");
}

#[tokio::test]
async fn test_register_signs_in() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    let user = shop
        .session()
        .register("Tess", "Ng", "tess@example.com", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(user.email.as_str(), "tess@example.com");
    assert_eq!(shop.session().current_user(), Some(user));
}

#[tokio::test]
async fn test_initialize_refreshes_stale_token() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront_with(backend.stale_session_store());

    let state = shop.session().initialize().await;

    assert!(state.is_authenticated());
    assert_eq!(backend.state().refresh_calls(), 1);
}

#[tokio::test]
async fn test_initialize_with_dead_session_is_anonymous() {
    let backend = FakeBackend::start().await;
    backend.state().fail_refresh(true);
    let shop = backend.storefront_with(backend.stale_session_store());

    let state = shop.session().initialize().await;

    assert_eq!(state, AuthState::Anonymous);
    assert!(!shop.api().tokens().has_access_token());
    assert_eq!(shop.session().snapshot().error, None);
}

#[tokio::test]
async fn test_initialize_without_token_skips_backend() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();

    assert_eq!(shop.session().initialize().await, AuthState::Anonymous);
    assert_eq!(backend.state().profile_calls(), 0);
}

#[tokio::test]
async fn test_logout_clears_tokens_even_when_backend_fails() {
    let backend = FakeBackend::start().await;
    backend.state().fail_logout(true);
    let shop = backend.storefront();
    shop.session()
        .login("sam@example.com", &password(PASSWORD))
        .await
        .unwrap();

    shop.session().logout().await;

    assert_eq!(shop.session().state(), AuthState::Anonymous);
    assert!(!shop.api().tokens().has_access_token());
    assert!(shop.api().tokens().refresh_token().is_none());
}

#[tokio::test]
async fn test_update_profile() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();
    shop.session()
        .login("sam@example.com", &password(PASSWORD))
        .await
        .unwrap();

    let changes = ProfileUpdate {
        phone: Some("555-0199".to_string()),
        ..ProfileUpdate::default()
    };
    let user = shop.session().update_profile(&changes).await.unwrap();

    assert_eq!(user.phone.as_deref(), Some("555-0199"));
    assert_eq!(shop.session().current_user().and_then(|u| u.phone), user.phone);
}

#[tokio::test]
async fn test_subscribers_see_sign_in() {
    let backend = FakeBackend::start().await;
    let shop = backend.storefront();
    let mut rx = shop.session().subscribe();

    shop.session()
        .login("sam@example.com", &password(PASSWORD))
        .await
        .unwrap();

    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().state.is_authenticated());
}
