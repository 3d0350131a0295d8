//! Orders as the client sees them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{OrderId, OrderLineId, ProductId, UserId};
use super::money::Money;
use super::status::OrderStatus;
use super::user::Address;
use crate::cart::{CartLine, ProductSnapshot};
use crate::pricing::OrderTotals;

/// Days between placing a local fallback order and its estimated delivery.
pub const ESTIMATED_DELIVERY_DAYS: i64 = 7;

/// A line on a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderLineId>,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_id: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    /// Display details. Remote orders embed the full product; only the
    /// snapshot fields are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            id: None,
            product_id: line.product_id.clone(),
            sku_id: line.product.sku.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.line_total(),
            product: Some(line.product.clone()),
        }
    }
}

/// An order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a client-only order from the request that failed to submit.
    ///
    /// Totals are recomputed from the request lines with the shared pricing
    /// rules. Status is always `pending`.
    #[must_use]
    pub fn local_fallback(id: OrderId, request: &CreateOrderRequest, now: DateTime<Utc>) -> Self {
        let items: Vec<OrderLine> = request.items.iter().map(OrderLine::from).collect();
        let totals = OrderTotals::from_subtotal(items.iter().map(|i| i.total_price).sum());

        Self {
            id,
            order_number: None,
            user_id: request.user_id.clone(),
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            status: OrderStatus::Pending,
            shipping_address: Some(request.shipping_address.clone()),
            billing_address: Some(request.billing_address.clone()),
            tracking_number: None,
            created_at: now,
            updated_at: None,
            estimated_delivery: Some(now + TimeDelta::days(ESTIMATED_DELIVERY_DAYS)),
        }
    }

    /// Σ line quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Where an order record came from.
///
/// Status tracking and cancellation must branch on this: a local fallback
/// record was never accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "order", rename_all = "snake_case")]
pub enum OrderRecord {
    /// Returned by the backend.
    Confirmed(Order),
    /// Synthesized on the client after submission failed.
    LocalFallback(Order),
}

impl OrderRecord {
    /// The order, regardless of source.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Confirmed(order) | Self::LocalFallback(order) => order,
        }
    }

    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Confirmed(order) | Self::LocalFallback(order) => order,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.order().id
    }

    /// Returns true for client-only records.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::LocalFallback(_))
    }
}

/// Contact details sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContact {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Body of `POST /orders`.
///
/// Payment details are never part of the request; the backend owns payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub items: Vec<CartLine>,
    pub contact: OrderContact,
    pub shipping_address: Address,
    pub billing_address: Address,
}

impl CreateOrderRequest {
    /// Totals for the request lines.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::for_lines(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LOCAL_ORDER_PREFIX;

    fn address() -> Address {
        Address {
            id: None,
            address_type: None,
            street: "12 Avenue Hassan II".to_string(),
            city: "Rabat".to_string(),
            state: "RS".to_string(),
            postal_code: "10000".to_string(),
            country: "MA".to_string(),
            is_default: false,
        }
    }

    fn line(id: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            unit_price: Money::from_cents(price),
            quantity,
            product: ProductSnapshot {
                name: format!("Product {id}"),
                image: None,
                sku: Some(format!("SKU-{id}")),
                category_id: None,
            },
        }
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: None,
            items: vec![line("p1", 2999, 2), line("p2", 1500, 1)],
            contact: OrderContact {
                email: Email::parse("buyer@example.com").expect("valid email"),
                first_name: "Youssef".to_string(),
                last_name: "Alami".to_string(),
                phone: "0600000000".to_string(),
            },
            shipping_address: address(),
            billing_address: address(),
        }
    }

    #[test]
    fn test_local_fallback_order() {
        let now = Utc::now();
        let id = OrderId::new(format!("{LOCAL_ORDER_PREFIX}abc"));
        let order = Order::local_fallback(id.clone(), &request(), now);

        assert_eq!(order.id, id);
        assert!(order.id.is_local());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, Money::from_cents(7498));
        assert_eq!(order.total.rounded(), Money::from_cents(9097));
        assert_eq!(order.items[0].total_price, Money::from_cents(5998));
        assert_eq!(order.item_count(), 3);
        assert_eq!(
            order.estimated_delivery,
            Some(now + TimeDelta::days(ESTIMATED_DELIVERY_DAYS))
        );
    }

    #[test]
    fn test_record_tag_survives_serialization() {
        let order = Order::local_fallback(OrderId::new("local-1"), &request(), Utc::now());
        let record = OrderRecord::LocalFallback(order);

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["source"], "local_fallback");

        let back: OrderRecord = serde_json::from_value(json).expect("deserialize");
        assert!(back.is_local());
        assert_eq!(back, record);
    }

    #[test]
    fn test_deserialize_remote_order_with_embedded_product() {
        let json = r#"{
            "id":"ord_1","orderNumber":"YS-1001","userId":"u1",
            "items":[{"id":"li1","productId":"p1","quantity":2,"unitPrice":"29.99","totalPrice":59.98,
                      "product":{"id":"p1","name":"Mug","price":29.99,"rating":4.5,"images":[]}}],
            "subtotal":59.98,"tax":4.80,"shipping":9.99,"total":74.77,
            "status":"processing","createdAt":"2026-01-15T10:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).expect("deserialize");

        assert_eq!(order.status, OrderStatus::Processing);
        assert!(!order.id.is_local());
        assert_eq!(
            order.items[0].product.as_ref().map(|p| p.name.as_str()),
            Some("Mug")
        );
    }
}
