use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A generated invoice PDF, stored base64-encoded with a 3-month expiry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredInvoice {
  pub id: Uuid,
  pub order_id: Uuid,
  pub invoice_no: String,
  pub pdf_base64: String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}
