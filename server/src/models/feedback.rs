use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Post-delivery feedback, one row per order, gated by a signed token.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feedback {
  pub id: Uuid,
  pub order_id: Uuid,
  pub customer_id: Uuid,
  pub fit_rating: i16,
  pub quality_rating: i16,
  pub delivery_rating: i16,
  pub service_rating: i16,
  pub comments: Option<String>,
  pub submitted_at: DateTime<Utc>,
}
