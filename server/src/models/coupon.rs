use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "coupon_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
  /// Shared code, limited by `usage_cap` total redemptions.
  Global,
  /// Personal code; a single redemption per user.
  Individual,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Coupon {
  pub id: Uuid,
  pub code: String,
  pub kind: CouponKind,
  pub discount_percent: i32,
  pub usage_cap: i32,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CouponUsage {
  pub id: Uuid,
  pub coupon_id: Uuid,
  pub customer_phone: String,
  pub order_id: Option<Uuid>,
  pub used_at: DateTime<Utc>,
}
