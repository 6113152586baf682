use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// The one fulfillment-stage enum shared by orders and shipments. The wire
/// format is camelCase (`outForDelivery`); the database enum is snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "fulfillment_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum FulfillmentStatus {
  Pending,
  Fulfilled,
  Shipped,
  OutForDelivery,
  Delivered,
}

impl FulfillmentStatus {
  pub fn label(&self) -> &'static str {
    match self {
      FulfillmentStatus::Pending => "pending",
      FulfillmentStatus::Fulfilled => "fulfilled",
      FulfillmentStatus::Shipped => "shipped",
      FulfillmentStatus::OutForDelivery => "out for delivery",
      FulfillmentStatus::Delivered => "delivered",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Prepaid,
  Unpaid,
}

/// A line item as stored inside the order's `items` jsonb column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
  pub title: String,
  pub quantity: i32,
  pub size: String,
  pub unit_price_paise: i64,
}

impl OrderItem {
  pub fn subtotal_paise(&self) -> i64 {
    self.unit_price_paise * i64::from(self.quantity)
  }
}

/// Totals are always recomputed from line items; client-supplied totals are
/// never stored.
pub fn compute_total_paise(items: &[OrderItem]) -> i64 {
  items.iter().map(OrderItem::subtotal_paise).sum()
}

/// Column list matching [`Order`]'s `FromRow` layout, for runtime queries.
pub const ORDER_COLUMNS: &str = "id, customer_id, customer_ref, items, ship_name, ship_phone, ship_address, \
  ship_city, ship_state, ship_pincode, total_paise, payment_status, status, fulfilled_at, shipped_at, \
  out_for_delivery_at, delivered_at, invoice_no, archived, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub customer_id: Uuid,
  pub customer_ref: String,
  pub items: Json<Vec<OrderItem>>,
  pub ship_name: String,
  pub ship_phone: String,
  pub ship_address: String,
  pub ship_city: String,
  pub ship_state: String,
  pub ship_pincode: String,
  pub total_paise: i64,
  pub payment_status: PaymentStatus,
  pub status: FulfillmentStatus,
  pub fulfilled_at: Option<DateTime<Utc>>,
  pub shipped_at: Option<DateTime<Utc>>,
  pub out_for_delivery_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub invoice_no: Option<String>,
  pub archived: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(title: &str, quantity: i32, unit_price_paise: i64) -> OrderItem {
    OrderItem {
      title: title.to_string(),
      quantity,
      size: "M".to_string(),
      unit_price_paise,
    }
  }

  #[test]
  fn total_is_sum_of_line_subtotals() {
    // 2 x Rs.100 + 1 x Rs.50 = Rs.250
    let items = vec![item("Oxford Shirt", 2, 10_000), item("Pocket Square", 1, 5_000)];
    assert_eq!(compute_total_paise(&items), 25_000);
  }

  #[test]
  fn empty_cart_totals_zero() {
    assert_eq!(compute_total_paise(&[]), 0);
  }

  #[test]
  fn status_wire_format_is_camel_case() {
    let s = serde_json::to_string(&FulfillmentStatus::OutForDelivery).unwrap();
    assert_eq!(s, "\"outForDelivery\"");
    let parsed: FulfillmentStatus = serde_json::from_str("\"outForDelivery\"").unwrap();
    assert_eq!(parsed, FulfillmentStatus::OutForDelivery);
  }
}
