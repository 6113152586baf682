//! Admin sign-in: a single shared password from config, exchanged for a
//! short-lived signed cookie.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::tokens;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct AdminLoginPayload {
  pub password: String,
}

#[instrument(name = "handler::admin_login", skip(app_state, payload))]
pub async fn admin_login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<AdminLoginPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.password != app_state.config.admin_password {
    warn!("admin login with wrong password");
    return Err(AppError::Auth("Wrong admin password.".to_string()));
  }

  let token = tokens::issue_admin(&app_state.config.jwt_secret, Utc::now())?;
  let cookie = Cookie::build(tokens::ADMIN_COOKIE, token)
    .path("/")
    .http_only(true)
    .max_age(CookieDuration::hours(12))
    .finish();

  info!("admin signed in");
  Ok(HttpResponse::Ok().cookie(cookie).json(json!({"message": "Signed in."})))
}

#[instrument(name = "handler::admin_logout", skip_all)]
pub async fn admin_logout_handler() -> HttpResponse {
  let mut cookie = Cookie::build(tokens::ADMIN_COOKIE, "").path("/").http_only(true).finish();
  cookie.make_removal();
  HttpResponse::Ok().cookie(cookie).json(json!({"message": "Signed out."}))
}
