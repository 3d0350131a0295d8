//! Checkout form data and its validation.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use super::email::{Email, EmailError};
use super::id::UserId;
use super::order::{CreateOrderRequest, OrderContact};
use super::user::{Address, AddressType};
use crate::cart::CartLine;

/// Why checkout data cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cannot check out an empty cart")]
    EmptyCart,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Everything the checkout form collects.
///
/// Card fields are secrets: they are redacted from `Debug` output and never
/// included in the order request.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub card_number: SecretString,
    pub card_expiry: SecretString,
    #[serde(rename = "cardCVC")]
    pub card_cvc: SecretString,
}

impl fmt::Debug for CheckoutData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutData")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("zip_code", &self.zip_code)
            .field("country", &self.country)
            .field("card_number", &"[REDACTED]")
            .field("card_expiry", &"[REDACTED]")
            .field("card_cvc", &"[REDACTED]")
            .finish()
    }
}

fn require(value: &str, field: &'static str) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        Err(CheckoutError::MissingField(field))
    } else {
        Ok(())
    }
}

impl CheckoutData {
    /// Check that every required field is filled in and the email is
    /// well-formed. Fields are checked in form order.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<Email, CheckoutError> {
        require(&self.email, "email")?;
        let email = Email::parse(&self.email)?;

        require(&self.first_name, "first name")?;
        require(&self.last_name, "last name")?;
        require(&self.phone, "phone")?;
        require(&self.address, "address")?;
        require(&self.city, "city")?;
        require(&self.state, "state")?;
        require(&self.zip_code, "zip code")?;
        require(&self.country, "country")?;
        require(self.card_number.expose_secret(), "card number")?;
        require(self.card_expiry.expose_secret(), "card expiry")?;
        require(self.card_cvc.expose_secret(), "card CVC")?;

        Ok(email)
    }

    /// The postal address entered on the form.
    #[must_use]
    pub fn postal_address(&self, address_type: AddressType) -> Address {
        Address {
            id: None,
            address_type: Some(address_type),
            street: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.zip_code.trim().to_string(),
            country: self.country.trim().to_string(),
            is_default: false,
        }
    }

    /// Compose the order-creation request for these lines.
    ///
    /// The entered address is used for both shipping and billing.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty line list, or the
    /// first validation failure.
    pub fn order_request(
        &self,
        lines: &[CartLine],
        user_id: Option<UserId>,
    ) -> Result<CreateOrderRequest, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let email = self.validate()?;

        Ok(CreateOrderRequest {
            user_id,
            items: lines.to_vec(),
            contact: OrderContact {
                email,
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                phone: self.phone.trim().to_string(),
            },
            shipping_address: self.postal_address(AddressType::Shipping),
            billing_address: self.postal_address(AddressType::Billing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ProductSnapshot;
    use crate::types::{Money, ProductId};

    fn checkout() -> CheckoutData {
        serde_json::from_value(serde_json::json!({
            "email": "salma@example.com",
            "firstName": "Salma",
            "lastName": "Bennani",
            "phone": "0611223344",
            "address": "5 Rue Tarik",
            "city": "Tangier",
            "state": "TT",
            "zipCode": "90000",
            "country": "MA",
            "cardNumber": "4242 4242 4242 4242",
            "cardExpiry": "12/29",
            "cardCVC": "123"
        }))
        .expect("valid checkout data")
    }

    fn line() -> CartLine {
        CartLine {
            product_id: ProductId::new("p1"),
            unit_price: Money::from_cents(1000),
            quantity: 1,
            product: ProductSnapshot {
                name: "Tea".to_string(),
                image: None,
                sku: None,
                category_id: None,
            },
        }
    }

    #[test]
    fn test_validate_accepts_complete_form() {
        let email = checkout().validate().expect("valid");
        assert_eq!(email.as_str(), "salma@example.com");
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let mut data = checkout();
        data.city = "   ".to_string();
        assert_eq!(data.validate(), Err(CheckoutError::MissingField("city")));

        let mut data = checkout();
        data.card_cvc = SecretString::from("");
        assert_eq!(data.validate(), Err(CheckoutError::MissingField("card CVC")));
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut data = checkout();
        data.email = "not-an-email".to_string();
        assert!(matches!(
            data.validate(),
            Err(CheckoutError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_order_request_refuses_empty_cart() {
        assert_eq!(
            checkout().order_request(&[], None),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_order_request_omits_card_data() {
        let request = checkout()
            .order_request(&[line()], Some(UserId::new("u1")))
            .expect("request");
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(!json.contains("4242"));
        assert!(json.contains("\"postalCode\":\"90000\""));
        assert_eq!(request.shipping_address.address_type, Some(AddressType::Shipping));
    }

    #[test]
    fn test_debug_redacts_card() {
        let debug = format!("{:?}", checkout());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("4242"));
        assert!(!debug.contains("12/29"));
    }
}
