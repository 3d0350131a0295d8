//! Typed wrappers for the backend's opaque string identifiers.

/// Declares a string-backed identifier type.
///
/// The generated type serializes as a bare string and converts from `&str`
/// and `String`, so a product id can never be passed where an order id is
/// expected.
///
/// ```rust
/// # use youshop_core::define_id;
/// define_id!(WishlistId);
///
/// let id = WishlistId::from("w-7");
/// assert_eq!(id.to_string(), "w-7");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

define_id!(UserId);
define_id!(AddressId);
define_id!(ProductId);
define_id!(CategoryId);
define_id!(OrderId);
define_id!(OrderLineId);

/// Marks ids minted on this device for orders the backend never accepted.
pub const LOCAL_ORDER_PREFIX: &str = "local-";

impl OrderId {
    /// Whether the order exists only in local storage.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ORDER_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_is_bare_string() {
        let id: ProductId = serde_json::from_str("\"p1\"").expect("deserialize");
        assert_eq!(id, ProductId::new("p1"));
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"p1\"");
    }

    #[test]
    fn test_only_prefixed_ids_are_local() {
        assert!(OrderId::new("local-0b6f").is_local());
        assert!(!OrderId::new("ord_1234").is_local());
        assert!(!OrderId::from("order-local-1").is_local());
    }
}
