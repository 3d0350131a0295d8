//! Account commands.

use youshop_storefront::Storefront;
use youshop_storefront::session::AuthState;

use super::password;

/// Sign in.
///
/// # Errors
///
/// Returns an error if no password is available or the backend rejects the
/// credentials.
pub async fn login(
    shop: &Storefront,
    email: &str,
    password_flag: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = password(password_flag)?;
    let user = shop.session().login(email, &password).await?;
    println!("Signed in as {} <{}>.", user.full_name(), user.email);
    Ok(())
}

/// Create an account and sign in.
///
/// # Errors
///
/// Returns an error if no password is available or the backend rejects the
/// registration.
pub async fn register(
    shop: &Storefront,
    first_name: &str,
    last_name: &str,
    email: &str,
    password_flag: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = password(password_flag)?;
    let user = shop
        .session()
        .register(first_name, last_name, email, &password)
        .await?;
    println!("Welcome, {}! Your account is ready.", user.first_name);
    Ok(())
}

pub async fn logout(shop: &Storefront) {
    shop.session().logout().await;
    println!("Signed out.");
}

pub fn whoami(shop: &Storefront) {
    match shop.session().state() {
        AuthState::Authenticated(user) => {
            println!("{} <{}>", user.full_name(), user.email);
            if let Some(phone) = &user.phone {
                println!("  Phone  {phone}");
            }
        }
        AuthState::Anonymous | AuthState::Unknown => println!("Not signed in."),
    }
}
