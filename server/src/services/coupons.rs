//! Coupon validation: pure rules plus the database-backed entry points.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Coupon, CouponKind, CouponUsage};

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
  Expired,
  AlreadyUsed,
  CapExhausted,
}

impl CouponRejection {
  pub fn message(&self) -> &'static str {
    match self {
      CouponRejection::Expired => "This coupon has expired.",
      CouponRejection::AlreadyUsed => "This coupon has already been used on this account.",
      CouponRejection::CapExhausted => "This coupon has reached its usage limit.",
    }
  }
}

/// The rules, independent of storage:
/// - an expired coupon is always rejected, whatever its remaining uses;
/// - the same user can redeem a code only once;
/// - a global code stops working once total usages reach the cap.
pub fn evaluate_coupon(
  coupon: &Coupon,
  total_usages: i64,
  used_by_caller: bool,
  now: DateTime<Utc>,
) -> std::result::Result<(), CouponRejection> {
  if now >= coupon.expires_at {
    return Err(CouponRejection::Expired);
  }
  if used_by_caller {
    return Err(CouponRejection::AlreadyUsed);
  }
  match coupon.kind {
    CouponKind::Individual => {
      if total_usages >= 1 {
        return Err(CouponRejection::AlreadyUsed);
      }
    }
    CouponKind::Global => {
      if total_usages >= i64::from(coupon.usage_cap) {
        return Err(CouponRejection::CapExhausted);
      }
    }
  }
  Ok(())
}

/// Looks up a code and applies the rules for `phone`. Returns the coupon when
/// it is applicable; otherwise a `Validation` error carrying the reason.
#[instrument(name = "coupons::validate", skip(pool))]
pub async fn validate_for(pool: &PgPool, code: &str, phone: &str) -> Result<Coupon> {
  let coupon: Option<Coupon> = sqlx::query_as(
    "SELECT id, code, kind, discount_percent, usage_cap, expires_at, created_at
     FROM coupons WHERE code = $1",
  )
  .bind(code)
  .fetch_optional(pool)
  .await?;

  let coupon = coupon.ok_or_else(|| AppError::NotFound(format!("Coupon '{}' does not exist.", code)))?;

  let total_usages: i64 = sqlx::query_scalar("SELECT count(*) FROM coupon_usages WHERE coupon_id = $1")
    .bind(coupon.id)
    .fetch_one(pool)
    .await?;

  let used_by_caller: bool =
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupon_usages WHERE coupon_id = $1 AND customer_phone = $2)")
      .bind(coupon.id)
      .bind(phone)
      .fetch_one(pool)
      .await?;

  evaluate_coupon(&coupon, total_usages, used_by_caller, Utc::now())
    .map_err(|rejection| AppError::Validation(rejection.message().to_string()))?;

  Ok(coupon)
}

/// Records a redemption after the order is created.
pub async fn record_usage(pool: &PgPool, coupon_id: Uuid, phone: &str, order_id: Uuid) -> Result<CouponUsage> {
  let usage: CouponUsage = sqlx::query_as(
    "INSERT INTO coupon_usages (coupon_id, customer_phone, order_id) VALUES ($1, $2, $3) \
     RETURNING id, coupon_id, customer_phone, order_id, used_at",
  )
  .bind(coupon_id)
  .bind(phone)
  .bind(order_id)
  .fetch_one(pool)
  .await?;
  Ok(usage)
}

/// Applies `discount_percent` to a total, rounding down to the paisa.
pub fn apply_discount(total_paise: i64, discount_percent: i32) -> i64 {
  total_paise - (total_paise * i64::from(discount_percent) / 100)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn coupon(kind: CouponKind, usage_cap: i32, expires_in: Duration) -> Coupon {
    Coupon {
      id: Uuid::new_v4(),
      code: "WINTER10".to_string(),
      kind,
      discount_percent: 10,
      usage_cap,
      expires_at: Utc::now() + expires_in,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn expired_coupon_is_rejected_even_with_uses_left() {
    let c = coupon(CouponKind::Global, 100, Duration::days(-1));
    assert_eq!(evaluate_coupon(&c, 0, false, Utc::now()), Err(CouponRejection::Expired));
  }

  #[test]
  fn second_use_by_same_user_is_rejected() {
    let c = coupon(CouponKind::Global, 100, Duration::days(30));
    assert_eq!(
      evaluate_coupon(&c, 5, true, Utc::now()),
      Err(CouponRejection::AlreadyUsed)
    );
  }

  #[test]
  fn individual_coupon_is_single_use() {
    let c = coupon(CouponKind::Individual, 1, Duration::days(30));
    assert_eq!(evaluate_coupon(&c, 0, false, Utc::now()), Ok(()));
    assert_eq!(
      evaluate_coupon(&c, 1, false, Utc::now()),
      Err(CouponRejection::AlreadyUsed)
    );
  }

  #[test]
  fn global_coupon_stops_at_its_cap() {
    let c = coupon(CouponKind::Global, 3, Duration::days(30));
    assert_eq!(evaluate_coupon(&c, 2, false, Utc::now()), Ok(()));
    assert_eq!(
      evaluate_coupon(&c, 3, false, Utc::now()),
      Err(CouponRejection::CapExhausted)
    );
  }

  #[test]
  fn discount_is_applied_in_whole_paise() {
    assert_eq!(apply_discount(25_000, 10), 22_500);
    assert_eq!(apply_discount(999, 33), 670);
    assert_eq!(apply_discount(10_000, 0), 10_000);
  }
}
