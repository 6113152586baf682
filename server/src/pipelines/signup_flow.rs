//! Storefront account sign-up.

use crate::errors::AppError;
use crate::models::Account;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::mailer::OutboundEmail;
use crate::services::{auth, emails};
use crate::state::AppState;
use darzi_flow::{ContextData, Flow, FlowRegistry, StepControl};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_signup_flow(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut flow = Flow::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_account", false, None),
    ("create_account", false, None),
    ("send_welcome_email", true, None),
  ]);

  flow.on_step("validate_signup_input", |ctx: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, password_len) = {
        let guard = ctx.read();
        (guard.email.clone(), guard.password.len())
      };

      if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_len < 8 {
        return Err(AppError::Validation(
          "Password must be at least 8 characters long.".to_string(),
        ));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("check_existing_account", |ctx: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, db_pool) = {
        let guard = ctx.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };

      let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
        .bind(&email)
        .fetch_one(&db_pool)
        .await?;
      if exists {
        warn!(%email, "signup attempt with existing email");
        return Err(AppError::Validation(
          "An account with this email already exists.".to_string(),
        ));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("create_account", |ctx: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, password, db_pool) = {
        let guard = ctx.read();
        (guard.email.clone(), guard.password.clone(), guard.app_state.db_pool.clone())
      };

      let password_hash = auth::hash_password(&password)?;
      let account: Account = sqlx::query_as(
        "INSERT INTO accounts (email, password_hash) VALUES ($1, $2) \
         RETURNING id, email, password_hash, created_at, updated_at",
      )
      .bind(&email)
      .bind(password_hash)
      .fetch_one(&db_pool)
      .await?;

      info!(account_id = %account.id, %email, "account created");
      ctx.write().created_account_id = Some(account.id);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("send_welcome_email", |ctx: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, app_state) = {
        let guard = ctx.read();
        (guard.email.clone(), guard.app_state.clone())
      };

      let recipient_name = email.split('@').next().unwrap_or("there").to_string();
      let rendered = emails::welcome_email(&recipient_name);
      match app_state
        .mailer
        .send(OutboundEmail {
          to: email.clone(),
          subject: rendered.subject,
          html_body: rendered.html,
          attachment: None,
        })
        .await
      {
        Ok(()) => ctx.write().welcome_email_sent = true,
        Err(e) => {
          // Optional step; signup succeeds without the welcome email.
          warn!(%email, error = %e, "welcome email failed");
          ctx.write().welcome_email_sent = false;
        }
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Signup flow registered.");
}
