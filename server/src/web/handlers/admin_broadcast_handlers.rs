//! Broadcast email to customers, throttled by the broadcast flow.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::{BroadcastCtxData, BroadcastTarget};
use crate::state::AppState;
use crate::web::extractors::AdminSession;
use darzi_flow::{ContextData, FlowOutcome};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
  pub subject: String,
  pub body_html: String,
  pub target: BroadcastTarget,
}

#[instrument(name = "handler::admin_broadcast", skip(app_state, payload, _admin), fields(subject = %payload.subject))]
pub async fn broadcast_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<BroadcastPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = ContextData::new(BroadcastCtxData::new(
    app_state.get_ref().clone(),
    payload.subject,
    payload.body_html,
    payload.target,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      info!(sent = guard.sent, failed = guard.failed, "broadcast finished");
      Ok(HttpResponse::Ok().json(json!({
        "recipients": guard.recipients.len(),
        "sent": guard.sent,
        "failed": guard.failed,
      })))
    }
    FlowOutcome::Halted => Err(AppError::Internal("Broadcast was halted.".to_string())),
  }
}
