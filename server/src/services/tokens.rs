//! Signed tokens: storefront sessions, admin sessions, and feedback links.
//!
//! All tokens are HS256 JWTs over the shared `JWT_SECRET`. Feedback tokens
//! bind an order to its customer and expire after 90 days; the same token is
//! checked on both the public feedback-retrieval and the submission endpoint.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "darzi_session";
pub const ADMIN_COOKIE: &str = "darzi_admin";

const TYP_SESSION: &str = "session";
const TYP_ADMIN: &str = "admin";
const TYP_FEEDBACK: &str = "feedback";

const SESSION_TTL_DAYS: i64 = 30;
const ADMIN_TTL_HOURS: i64 = 12;
const FEEDBACK_TTL_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
  pub sub: Uuid,
  pub typ: String,
  pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
  pub typ: String,
  pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackClaims {
  pub order_id: Uuid,
  pub customer_id: Uuid,
  pub typ: String,
  pub exp: i64,
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
  encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
    .map_err(|e| AppError::Token(format!("Failed to sign token: {}", e)))
}

fn verify<T: for<'de> Deserialize<'de>>(token: &str, secret: &str) -> Result<T, AppError> {
  let mut validation = Validation::default();
  validation.validate_exp = true;
  decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
    .map(|data| data.claims)
    .map_err(|e| AppError::Token(format!("Invalid or expired token: {}", e)))
}

pub fn issue_session(account_id: Uuid, secret: &str, now: DateTime<Utc>) -> Result<String, AppError> {
  sign(
    &SessionClaims {
      sub: account_id,
      typ: TYP_SESSION.to_string(),
      exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
    },
    secret,
  )
}

pub fn verify_session(token: &str, secret: &str) -> Result<SessionClaims, AppError> {
  let claims: SessionClaims = verify(token, secret)?;
  if claims.typ != TYP_SESSION {
    return Err(AppError::Token("Wrong token type.".to_string()));
  }
  Ok(claims)
}

pub fn issue_admin(secret: &str, now: DateTime<Utc>) -> Result<String, AppError> {
  sign(
    &AdminClaims {
      typ: TYP_ADMIN.to_string(),
      exp: (now + Duration::hours(ADMIN_TTL_HOURS)).timestamp(),
    },
    secret,
  )
}

pub fn verify_admin(token: &str, secret: &str) -> Result<AdminClaims, AppError> {
  let claims: AdminClaims = verify(token, secret)?;
  if claims.typ != TYP_ADMIN {
    return Err(AppError::Token("Wrong token type.".to_string()));
  }
  Ok(claims)
}

pub fn issue_feedback_token(
  order_id: Uuid,
  customer_id: Uuid,
  secret: &str,
  now: DateTime<Utc>,
) -> Result<String, AppError> {
  sign(
    &FeedbackClaims {
      order_id,
      customer_id,
      typ: TYP_FEEDBACK.to_string(),
      exp: (now + Duration::days(FEEDBACK_TTL_DAYS)).timestamp(),
    },
    secret,
  )
}

pub fn verify_feedback_token(token: &str, secret: &str) -> Result<FeedbackClaims, AppError> {
  let claims: FeedbackClaims = verify(token, secret)?;
  if claims.typ != TYP_FEEDBACK {
    return Err(AppError::Token("Wrong token type.".to_string()));
  }
  Ok(claims)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "test-secret";

  #[test]
  fn feedback_token_round_trips() {
    let order_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let token = issue_feedback_token(order_id, customer_id, SECRET, Utc::now()).unwrap();

    let claims = verify_feedback_token(&token, SECRET).unwrap();
    assert_eq!(claims.order_id, order_id);
    assert_eq!(claims.customer_id, customer_id);
  }

  #[test]
  fn expired_feedback_token_is_rejected() {
    // Issue as if 91 days ago; decode leeway is far smaller than a day.
    let issued = Utc::now() - Duration::days(91);
    let token = issue_feedback_token(Uuid::new_v4(), Uuid::new_v4(), SECRET, issued).unwrap();
    assert!(verify_feedback_token(&token, SECRET).is_err());
  }

  #[test]
  fn tampered_token_is_rejected() {
    let token = issue_feedback_token(Uuid::new_v4(), Uuid::new_v4(), SECRET, Utc::now()).unwrap();
    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('a') { 'b' } else { 'a' });
    assert!(verify_feedback_token(&tampered, SECRET).is_err());
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = issue_session(Uuid::new_v4(), SECRET, Utc::now()).unwrap();
    assert!(verify_session(&token, "other-secret").is_err());
  }

  #[test]
  fn session_token_is_not_a_feedback_token() {
    let token = issue_session(Uuid::new_v4(), SECRET, Utc::now()).unwrap();
    assert!(verify_feedback_token(&token, SECRET).is_err());
  }
}
