//! Request guards: the storefront session and the admin session, both read
//! from signed cookies.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::tokens;
use crate::state::AppState;

/// A storefront user with a valid `darzi_session` cookie.
#[derive(Debug)]
pub struct AuthenticatedCustomer {
  pub account_id: Uuid,
}

impl FromRequest for AuthenticatedCustomer {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = (|| {
      let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("Application state not configured.".to_string()))?;
      let cookie = req
        .cookie(tokens::SESSION_COOKIE)
        .ok_or_else(|| AppError::Auth("Sign in required.".to_string()))?;
      let claims = tokens::verify_session(cookie.value(), &state.config.jwt_secret).map_err(|e| {
        warn!(error = %e, "invalid session cookie");
        AppError::Auth("Session is invalid or expired.".to_string())
      })?;
      Ok(AuthenticatedCustomer {
        account_id: claims.sub,
      })
    })();
    ready(result)
  }
}

/// The cookie-based gate in front of every `/admin` endpoint.
#[derive(Debug)]
pub struct AdminSession;

impl FromRequest for AdminSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = (|| {
      let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("Application state not configured.".to_string()))?;
      let cookie = req
        .cookie(tokens::ADMIN_COOKIE)
        .ok_or_else(|| AppError::Auth("Admin sign-in required.".to_string()))?;
      tokens::verify_admin(cookie.value(), &state.config.jwt_secret).map_err(|e| {
        warn!(error = %e, "invalid admin cookie");
        AppError::Auth("Admin session is invalid or expired.".to_string())
      })?;
      Ok(AdminSession)
    })();
    ready(result)
  }
}
