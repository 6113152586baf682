use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list matching [`Customer`]'s `FromRow` layout, for runtime queries.
pub const CUSTOMER_COLUMNS: &str =
  "id, code, name, phone, emails, address, city, state, pincode, archived, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
  pub id: Uuid,
  /// Sequential human-readable identifier, e.g. `CUST-42`.
  pub code: String,
  pub name: String,
  /// Canonical phone number; the primary dedup key.
  pub phone: String,
  pub emails: Vec<String>,
  pub address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub archived: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Customer {
  /// First known email address, if any.
  pub fn primary_email(&self) -> Option<&str> {
    self.emails.first().map(String::as_str)
  }
}
