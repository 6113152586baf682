//! Newsletter signup.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct SubscribePayload {
  pub email: String,
}

#[instrument(name = "handler::newsletter_subscribe", skip(app_state, payload), fields(email = %payload.email))]
pub async fn subscribe_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SubscribePayload>,
) -> Result<HttpResponse, AppError> {
  if payload.email.is_empty() || !payload.email.contains('@') {
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }

  sqlx::query("INSERT INTO newsletter_subscribers (email) VALUES ($1) ON CONFLICT (email) DO NOTHING")
    .bind(&payload.email)
    .execute(&app_state.db_pool)
    .await?;

  info!("newsletter subscription stored");
  Ok(HttpResponse::Ok().json(json!({"message": "Subscribed."})))
}
