//! Storefront auth: signup, signin, password reset.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::Account;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::mailer::OutboundEmail;
use crate::services::{auth, emails, tokens};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedCustomer;
use darzi_flow::{ContextData, FlowOutcome};

const RESET_CODE_TTL_MINUTES: i64 = 15;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetRequestPayload {
  pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetConfirmPayload {
  pub email: String,
  pub code: String,
  pub new_password: String,
}

#[instrument(name = "handler::signup", skip(app_state, payload), fields(email = %payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email.clone(),
    password: payload.password.clone(),
    created_account_id: None,
    welcome_email_sent: false,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let account_id = guard
        .created_account_id
        .ok_or_else(|| AppError::Internal("Signup completed without creating an account.".to_string()))?;
      info!(%account_id, "signup successful");
      Ok(HttpResponse::Created().json(json!({
        "message": "Account created successfully.",
        "accountId": account_id.to_string(),
        "email": payload.email,
        "welcomeEmailSent": guard.welcome_email_sent,
      })))
    }
    FlowOutcome::Halted => {
      warn!("signup flow halted unexpectedly");
      Err(AppError::Internal("Signup process was halted.".to_string()))
    }
  }
}

#[instrument(name = "handler::signin", skip(app_state, payload), fields(email = %payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email.clone(),
    password: payload.password.clone(),
    stored_password_hash: None,
    account_id: None,
    session_token: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let account_id = guard
        .account_id
        .ok_or_else(|| AppError::Auth("Signin completed without identifying the account.".to_string()))?;
      let token = guard
        .session_token
        .clone()
        .ok_or_else(|| AppError::Auth("Signin completed without a session token.".to_string()))?;

      let cookie = Cookie::build(tokens::SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::days(30))
        .finish();

      info!(%account_id, "signin successful");
      Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "message": "Signed in successfully.",
        "accountId": account_id.to_string(),
        "email": payload.email,
      })))
    }
    FlowOutcome::Halted => Err(AppError::Auth("Authentication process was halted.".to_string())),
  }
}

#[instrument(name = "handler::me", skip(app_state, user))]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedCustomer,
) -> Result<HttpResponse, AppError> {
  let account: Option<Account> = sqlx::query_as(
    "SELECT id, email, password_hash, created_at, updated_at FROM accounts WHERE id = $1",
  )
  .bind(user.account_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  let account = account.ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "accountId": account.id.to_string(),
    "email": account.email,
    "memberSince": account.created_at,
  })))
}

#[instrument(name = "handler::reset_request", skip(app_state, payload), fields(email = %payload.email))]
pub async fn reset_request_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ResetRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
    .bind(&payload.email)
    .fetch_one(&app_state.db_pool)
    .await?;
  if !exists {
    return Err(AppError::NotFound("No account with this email.".to_string()));
  }

  let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
  let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
  sqlx::query("INSERT INTO password_resets (email, code, expires_at) VALUES ($1, $2, $3)")
    .bind(&payload.email)
    .bind(&code)
    .bind(expires_at)
    .execute(&app_state.db_pool)
    .await?;

  let rendered = emails::password_reset_email(&code);
  if let Err(e) = app_state
    .mailer
    .send(OutboundEmail {
      to: payload.email.clone(),
      subject: rendered.subject,
      html_body: rendered.html,
      attachment: None,
    })
    .await
  {
    warn!(error = %e, "failed to send reset code email");
    return Err(AppError::Mail("Could not send the reset code.".to_string()));
  }

  Ok(HttpResponse::Ok().json(json!({"message": "Reset code sent."})))
}

#[instrument(name = "handler::reset_confirm", skip(app_state, payload), fields(email = %payload.email))]
pub async fn reset_confirm_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ResetConfirmPayload>,
) -> Result<HttpResponse, AppError> {
  let reset_id: Option<uuid::Uuid> = sqlx::query_scalar(
    "SELECT id FROM password_resets \
     WHERE email = $1 AND code = $2 AND used = FALSE AND expires_at > now() \
     ORDER BY created_at DESC LIMIT 1",
  )
  .bind(&payload.email)
  .bind(&payload.code)
  .fetch_optional(&app_state.db_pool)
  .await?;

  let reset_id = reset_id.ok_or_else(|| AppError::Validation("Invalid or expired reset code.".to_string()))?;

  if payload.new_password.len() < 8 {
    return Err(AppError::Validation(
      "Password must be at least 8 characters long.".to_string(),
    ));
  }
  let password_hash = auth::hash_password(&payload.new_password)?;

  let mut tx = app_state.db_pool.begin().await?;
  sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = now() WHERE email = $2")
    .bind(&password_hash)
    .bind(&payload.email)
    .execute(&mut *tx)
    .await?;
  sqlx::query("UPDATE password_resets SET used = TRUE WHERE id = $1")
    .bind(reset_id)
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  info!("password reset completed");
  Ok(HttpResponse::Ok().json(json!({"message": "Password updated. You can sign in now."})))
}
