//! Customer groups, the broadcast targets.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CustomerGroup;
use crate::state::AppState;
use crate::web::extractors::AdminSession;

const GROUP_COLUMNS: &str = "id, name, customer_ids, created_at";

#[instrument(name = "handler::admin_list_groups", skip(app_state, _admin))]
pub async fn list_groups_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let groups: Vec<CustomerGroup> =
    sqlx::query_as(&format!("SELECT {} FROM customer_groups ORDER BY name ASC", GROUP_COLUMNS))
      .fetch_all(&app_state.db_pool)
      .await?;
  Ok(HttpResponse::Ok().json(json!({ "groups": groups })))
}

#[derive(Deserialize, Debug)]
pub struct GroupPayload {
  pub name: String,
  #[serde(default)]
  pub customer_ids: Vec<Uuid>,
}

#[instrument(name = "handler::admin_create_group", skip(app_state, payload, _admin), fields(name = %payload.name))]
pub async fn create_group_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<GroupPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  if payload.name.trim().is_empty() {
    return Err(AppError::Validation("Group name is required.".to_string()));
  }

  let group: CustomerGroup = sqlx::query_as(&format!(
    "INSERT INTO customer_groups (name, customer_ids) VALUES ($1, $2) RETURNING {}",
    GROUP_COLUMNS
  ))
  .bind(&payload.name)
  .bind(&payload.customer_ids)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(group_id = %group.id, "group created");
  Ok(HttpResponse::Created().json(json!({ "group": group })))
}

#[instrument(name = "handler::admin_update_group", skip(app_state, payload, _admin))]
pub async fn update_group_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<GroupPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let group_id = path.into_inner();
  let group: Option<CustomerGroup> = sqlx::query_as(&format!(
    "UPDATE customer_groups SET name = $1, customer_ids = $2 WHERE id = $3 RETURNING {}",
    GROUP_COLUMNS
  ))
  .bind(&payload.name)
  .bind(&payload.customer_ids)
  .bind(group_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match group {
    Some(group) => Ok(HttpResponse::Ok().json(json!({ "group": group }))),
    None => Err(AppError::NotFound(format!("Group {} not found.", group_id))),
  }
}

#[instrument(name = "handler::admin_delete_group", skip(app_state, _admin))]
pub async fn delete_group_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let group_id = path.into_inner();
  let result = sqlx::query("DELETE FROM customer_groups WHERE id = $1")
    .bind(group_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Group {} not found.", group_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Group deleted."})))
}
