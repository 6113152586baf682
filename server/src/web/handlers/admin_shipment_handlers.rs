//! Admin shipment views. Status changes route through the same transition
//! flow as orders, keyed by the shipment's order.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle::TransitionMeta;
use crate::models::shipment::SHIPMENT_COLUMNS;
use crate::models::{FulfillmentStatus, Shipment};
use crate::pipelines::contexts::StatusCtxData;
use crate::state::AppState;
use crate::web::extractors::AdminSession;
use darzi_flow::{ContextData, FlowOutcome};

#[derive(Deserialize, Debug)]
pub struct ListShipmentsQuery {
  pub status: Option<FulfillmentStatus>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

#[instrument(name = "handler::admin_list_shipments", skip(app_state, query, _admin))]
pub async fn list_shipments_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListShipmentsQuery>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let shipments: Vec<Shipment> = sqlx::query_as(&format!(
    "SELECT {} FROM shipments \
     WHERE ($1::fulfillment_status IS NULL OR status = $1) \
     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    SHIPMENT_COLUMNS
  ))
  .bind(query.status)
  .bind(query.limit.unwrap_or(50).clamp(1, 500))
  .bind(query.offset.unwrap_or(0).max(0))
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "shipments": shipments })))
}

#[instrument(name = "handler::admin_get_shipment", skip(app_state, _admin))]
pub async fn get_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let shipment_id = path.into_inner();
  let shipment: Option<Shipment> =
    sqlx::query_as(&format!("SELECT {} FROM shipments WHERE id = $1", SHIPMENT_COLUMNS))
      .bind(shipment_id)
      .fetch_optional(&app_state.db_pool)
      .await?;

  match shipment {
    Some(shipment) => Ok(HttpResponse::Ok().json(json!({ "shipment": shipment }))),
    None => Err(AppError::NotFound(format!("Shipment {} not found.", shipment_id))),
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShipmentPayload {
  pub tracking_id: Option<String>,
  pub carrier: Option<String>,
  pub packaging_provider: Option<String>,
}

#[instrument(name = "handler::admin_update_shipment", skip(app_state, payload, _admin))]
pub async fn update_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateShipmentPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let shipment_id = path.into_inner();
  let shipment: Option<Shipment> = sqlx::query_as(&format!(
    "UPDATE shipments SET \
       tracking_id = COALESCE($1, tracking_id), \
       carrier = COALESCE($2, carrier), \
       packaging_provider = COALESCE($3, packaging_provider), \
       updated_at = now() \
     WHERE id = $4 RETURNING {}",
    SHIPMENT_COLUMNS
  ))
  .bind(&payload.tracking_id)
  .bind(&payload.carrier)
  .bind(&payload.packaging_provider)
  .bind(shipment_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match shipment {
    Some(shipment) => {
      info!(shipment_id = %shipment.id, "shipment metadata updated");
      Ok(HttpResponse::Ok().json(json!({ "shipment": shipment })))
    }
    None => Err(AppError::NotFound(format!("Shipment {} not found.", shipment_id))),
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatusPayload {
  pub status: FulfillmentStatus,
  pub carrier: Option<String>,
  pub packaging_provider: Option<String>,
  pub tracking_id: Option<String>,
}

#[instrument(name = "handler::admin_update_shipment_status", skip(app_state, payload, _admin), fields(target = ?payload.status))]
pub async fn update_shipment_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<ShipmentStatusPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let shipment_id = path.into_inner();
  let payload = payload.into_inner();

  let order_id: Option<Uuid> = sqlx::query_scalar("SELECT order_id FROM shipments WHERE id = $1")
    .bind(shipment_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let order_id = order_id.ok_or_else(|| AppError::NotFound(format!("Shipment {} not found.", shipment_id)))?;

  let ctx = ContextData::new(StatusCtxData::new(
    app_state.get_ref().clone(),
    order_id,
    payload.status,
    TransitionMeta {
      carrier: payload.carrier,
      packaging_provider: payload.packaging_provider,
      tracking_id: payload.tracking_id,
    },
  ));

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      Ok(HttpResponse::Ok().json(json!({
        "order": guard.order,
        "shipment": guard.shipment,
        "emailSent": guard.email_sent,
      })))
    }
    FlowOutcome::Halted => {
      warn!(shipment_id = %shipment_id, "status flow halted unexpectedly");
      Err(AppError::Internal("Status update was halted.".to_string()))
    }
  }
}
