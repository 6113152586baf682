//! Public feedback endpoints, gated by the signed token from the delivery
//! email. The same token guards both retrieval and submission.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::order::ORDER_COLUMNS;
use crate::models::{Feedback, Order};
use crate::services::tokens;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct SubmitFeedbackPayload {
  pub fit_rating: i16,
  pub quality_rating: i16,
  pub delivery_rating: i16,
  pub service_rating: i16,
  pub comments: Option<String>,
}

async fn load_order_for_token(
  app_state: &AppState,
  token: &str,
) -> Result<(Order, tokens::FeedbackClaims), AppError> {
  let claims = tokens::verify_feedback_token(token, &app_state.config.jwt_secret)?;

  let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(claims.order_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let order = order.ok_or_else(|| AppError::NotFound("Order no longer exists.".to_string()))?;

  if order.customer_id != claims.customer_id {
    return Err(AppError::Token("Token does not match this order.".to_string()));
  }
  Ok((order, claims))
}

#[instrument(name = "handler::get_feedback_context", skip(app_state, path))]
pub async fn get_feedback_context_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let token = path.into_inner();
  let (order, _claims) = load_order_for_token(&app_state, &token).await?;

  let already_submitted: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM feedback WHERE order_id = $1)")
    .bind(order.id)
    .fetch_one(&app_state.db_pool)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "order": {
      "id": order.id.to_string(),
      "items": order.items.0,
      "totalPaise": order.total_paise,
      "deliveredAt": order.delivered_at,
    },
    "alreadySubmitted": already_submitted,
  })))
}

#[instrument(name = "handler::submit_feedback", skip(app_state, path, payload))]
pub async fn submit_feedback_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<SubmitFeedbackPayload>,
) -> Result<HttpResponse, AppError> {
  let token = path.into_inner();
  let (order, claims) = load_order_for_token(&app_state, &token).await?;

  for (label, rating) in [
    ("fit", payload.fit_rating),
    ("quality", payload.quality_rating),
    ("delivery", payload.delivery_rating),
    ("service", payload.service_rating),
  ] {
    if !(1..=5).contains(&rating) {
      return Err(AppError::Validation(format!(
        "The {} rating must be between 1 and 5.",
        label
      )));
    }
  }

  let already_submitted: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM feedback WHERE order_id = $1)")
    .bind(order.id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if already_submitted {
    return Err(AppError::Conflict("Feedback already submitted for this order.".to_string()));
  }

  let inserted: Result<Feedback, sqlx::Error> = sqlx::query_as(
    "INSERT INTO feedback (order_id, customer_id, fit_rating, quality_rating, delivery_rating, service_rating, comments) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) \
     RETURNING id, order_id, customer_id, fit_rating, quality_rating, delivery_rating, service_rating, comments, submitted_at",
  )
  .bind(order.id)
  .bind(claims.customer_id)
  .bind(payload.fit_rating)
  .bind(payload.quality_rating)
  .bind(payload.delivery_rating)
  .bind(payload.service_rating)
  .bind(&payload.comments)
  .fetch_one(&app_state.db_pool)
  .await;

  let feedback = match inserted {
    Ok(f) => f,
    // The unique index closes the race the existence check leaves open.
    Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
      return Err(AppError::Conflict("Feedback already submitted for this order.".to_string()));
    }
    Err(e) => return Err(AppError::Sqlx(e)),
  };

  info!(order_id = %order.id, "feedback recorded");
  Ok(HttpResponse::Created().json(json!({
    "message": "Thanks for your feedback.",
    "feedbackId": feedback.id.to_string(),
  })))
}
