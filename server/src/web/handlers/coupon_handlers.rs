//! Public coupon validation for the cart page.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::coupons;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ValidateCouponPayload {
  pub code: String,
  pub phone: String,
}

#[instrument(name = "handler::validate_coupon", skip(app_state, payload), fields(code = %payload.code))]
pub async fn validate_coupon_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ValidateCouponPayload>,
) -> Result<HttpResponse, AppError> {
  // Rejections surface as 400s carrying the reason.
  let coupon = coupons::validate_for(&app_state.db_pool, &payload.code, &payload.phone).await?;
  Ok(HttpResponse::Ok().json(json!({
    "valid": true,
    "code": coupon.code,
    "discountPercent": coupon.discount_percent,
  })))
}
