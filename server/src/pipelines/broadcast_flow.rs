//! Broadcast email to customers, in fixed-size batches with a fixed pause
//! between batches so the SMTP relay is never flooded. The only throttling in
//! the system. Failed sends are logged, counted, and skipped; no retries.

use crate::errors::AppError;
use crate::models::CustomerGroup;
use crate::pipelines::contexts::{BroadcastCtxData, BroadcastTarget};
use crate::services::emails;
use crate::services::mailer::OutboundEmail;
use crate::state::AppState;
use darzi_flow::{ContextData, Flow, FlowRegistry, StepControl};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn register_broadcast_flow(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut flow = Flow::<BroadcastCtxData, AppError>::new(&[
    ("resolve_recipients", false, None),
    ("send_in_batches", false, None),
  ]);

  flow.on_step("resolve_recipients", |ctx: ContextData<BroadcastCtxData>| {
    Box::pin(async move {
      let (subject, target, db_pool) = {
        let guard = ctx.read();
        (guard.subject.clone(), guard.target.clone(), guard.app_state.db_pool.clone())
      };

      if subject.trim().is_empty() {
        return Err(AppError::Validation("Broadcast subject is required.".to_string()));
      }

      let rows: Vec<Vec<String>> = match target {
        BroadcastTarget::All => {
          sqlx::query_scalar("SELECT emails FROM customers WHERE archived = FALSE")
            .fetch_all(&db_pool)
            .await?
        }
        BroadcastTarget::Group { group_id } => {
          let group: Option<CustomerGroup> =
            sqlx::query_as("SELECT id, name, customer_ids, created_at FROM customer_groups WHERE id = $1")
              .bind(group_id)
              .fetch_optional(&db_pool)
              .await?;
          let group = group.ok_or_else(|| AppError::NotFound(format!("Group {} not found.", group_id)))?;
          sqlx::query_scalar("SELECT emails FROM customers WHERE id = ANY($1) AND archived = FALSE")
            .bind(&group.customer_ids)
            .fetch_all(&db_pool)
            .await?
        }
        BroadcastTarget::Customers { customer_ids } => {
          sqlx::query_scalar("SELECT emails FROM customers WHERE id = ANY($1) AND archived = FALSE")
            .bind(&customer_ids)
            .fetch_all(&db_pool)
            .await?
        }
      };

      // First address per customer, deduplicated across the audience.
      let mut recipients: Vec<String> = Vec::new();
      for emails in rows {
        if let Some(first) = emails.into_iter().next() {
          if !first.is_empty() && !recipients.contains(&first) {
            recipients.push(first);
          }
        }
      }

      if recipients.is_empty() {
        return Err(AppError::Validation(
          "No customers with an email address match this target.".to_string(),
        ));
      }

      info!(count = recipients.len(), "broadcast recipients resolved");
      ctx.write().recipients = recipients;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on_step("send_in_batches", |ctx: ContextData<BroadcastCtxData>| {
    Box::pin(async move {
      let (subject, body_html, recipients, app_state) = {
        let guard = ctx.read();
        (
          guard.subject.clone(),
          guard.body_html.clone(),
          guard.recipients.clone(),
          guard.app_state.clone(),
        )
      };

      let rendered = emails::broadcast_email(&subject, &body_html);
      let batch_size = app_state.config.broadcast_batch_size.max(1);
      let delay = Duration::from_millis(app_state.config.broadcast_batch_delay_ms);

      let mut sent = 0usize;
      let mut failed = 0usize;
      for (batch_idx, batch) in recipients.chunks(batch_size).enumerate() {
        if batch_idx > 0 {
          tokio::time::sleep(delay).await;
        }
        for recipient in batch {
          match app_state
            .mailer
            .send(OutboundEmail {
              to: recipient.clone(),
              subject: rendered.subject.clone(),
              html_body: rendered.html.clone(),
              attachment: None,
            })
            .await
          {
            Ok(()) => sent += 1,
            Err(e) => {
              warn!(to = %recipient, error = %e, "broadcast send failed");
              failed += 1;
            }
          }
        }
        info!(batch = batch_idx + 1, sent, failed, "broadcast batch done");
      }

      {
        let mut guard = ctx.write();
        guard.sent = sent;
        guard.failed = failed;
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Broadcast flow registered.");
}
