use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Named set of customers, used as a broadcast target.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerGroup {
  pub id: Uuid,
  pub name: String,
  pub customer_ids: Vec<Uuid>,
  pub created_at: DateTime<Utc>,
}
