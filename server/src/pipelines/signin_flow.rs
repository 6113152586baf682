//! Storefront sign-in: fetch account, verify password, issue the session JWT.

use crate::errors::AppError;
use crate::models::Account;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::{auth, tokens};
use crate::state::AppState;
use chrono::Utc;
use darzi_flow::{ContextData, Flow, FlowRegistry, StepControl};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_signin_flow(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut flow = Flow::<SigninCtxData, AppError>::new(&[
    ("fetch_account", false, None),
    ("verify_password", false, None),
    ("issue_session_token", false, None),
  ]);

  flow.on_step("fetch_account", |ctx: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, db_pool) = {
        let guard = ctx.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };

      let account: Option<Account> = sqlx::query_as(
        "SELECT id, email, password_hash, created_at, updated_at FROM accounts WHERE email = $1",
      )
      .bind(&email)
      .fetch_optional(&db_pool)
      .await?;

      // Same error for unknown email and wrong password.
      let account = account.ok_or_else(|| AppError::Auth("Invalid email or password.".to_string()))?;
      {
        let mut guard = ctx.write();
        guard.account_id = Some(account.id);
        guard.stored_password_hash = Some(account.password_hash);
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("verify_password", |ctx: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (password, stored_hash) = {
        let guard = ctx.read();
        (
          guard.password.clone(),
          guard
            .stored_password_hash
            .clone()
            .ok_or_else(|| AppError::Internal("account hash not loaded".to_string()))?,
        )
      };

      if !auth::verify_password(&stored_hash, &password)? {
        warn!("signin with wrong password");
        return Err(AppError::Auth("Invalid email or password.".to_string()));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("issue_session_token", |ctx: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (account_id, secret) = {
        let guard = ctx.read();
        (
          guard
            .account_id
            .ok_or_else(|| AppError::Internal("account id not loaded".to_string()))?,
          guard.app_state.config.jwt_secret.clone(),
        )
      };

      let token = tokens::issue_session(account_id, &secret, Utc::now())?;
      ctx.write().session_token = Some(token);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Signin flow registered.");
}
