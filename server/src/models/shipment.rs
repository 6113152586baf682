use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::order::FulfillmentStatus;

/// Column list matching [`Shipment`]'s `FromRow` layout, for runtime queries.
pub const SHIPMENT_COLUMNS: &str = "id, order_id, customer_id, status, tracking_id, carrier, packaging_provider, \
  fulfilled_at, shipped_at, out_for_delivery_at, delivered_at, created_at, updated_at";

/// Physical fulfillment record, one per order, created together with it.
/// Status and stage timestamps always mirror the order's.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Shipment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub customer_id: Uuid,
  pub status: FulfillmentStatus,
  pub tracking_id: Option<String>,
  pub carrier: Option<String>,
  pub packaging_provider: Option<String>,
  pub fulfilled_at: Option<DateTime<Utc>>,
  pub shipped_at: Option<DateTime<Utc>>,
  pub out_for_delivery_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
