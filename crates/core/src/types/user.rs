//! Customer account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{AddressId, UserId};

/// Whether an address is used for delivery or invoicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Shipping,
    Billing,
}

/// A postal address.
///
/// Saved addresses carry an ID, type and default flag; addresses embedded in
/// an order request omit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub address_type: Option<AddressType>,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The signed-in customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// First and last name joined for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The default address of the given type, if any.
    #[must_use]
    pub fn default_address(&self, address_type: AddressType) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.is_default && a.address_type == Some(address_type))
    }
}

/// Partial profile update. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.avatar.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_user_without_addresses() {
        let json = r#"{"id":"u1","email":"a@b.co","firstName":"Amina","lastName":"Idrissi"}"#;
        let user: User = serde_json::from_str(json).expect("deserialize");
        assert!(user.addresses.is_empty());
        assert_eq!(user.full_name(), "Amina Idrissi");
    }

    #[test]
    fn test_default_address() {
        let json = r#"{
            "id":"u1","email":"a@b.co","firstName":"A","lastName":"B",
            "addresses":[
                {"type":"billing","street":"1 Rue","city":"Rabat","state":"RS","postalCode":"10000","country":"MA","isDefault":true},
                {"type":"shipping","street":"2 Rue","city":"Fes","state":"FM","postalCode":"30000","country":"MA","isDefault":false},
                {"type":"shipping","street":"3 Rue","city":"Casablanca","state":"CS","postalCode":"20000","country":"MA","isDefault":true}
            ]
        }"#;
        let user: User = serde_json::from_str(json).expect("deserialize");
        let shipping = user
            .default_address(AddressType::Shipping)
            .expect("default shipping");
        assert_eq!(shipping.city, "Casablanca");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            phone: Some("+212600000000".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).expect("serialize");
        assert_eq!(json, r#"{"phone":"+212600000000"}"#);
        assert!(ProfileUpdate::default().is_empty());
    }
}
