//! Catalog upkeep. Public browsing lives in `product_handlers`.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Product;
use crate::state::AppState;
use crate::web::extractors::AdminSession;

const PRODUCT_COLUMNS: &str = "id, name, description, category, sizes, price_paise, stock_quantity, created_at, updated_at";

#[derive(Deserialize, Debug)]
pub struct ProductPayload {
  pub name: String,
  pub description: Option<String>,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub sizes: Vec<String>,
  pub price_paise: i64,
  #[serde(default)]
  pub stock_quantity: i32,
}

#[instrument(name = "handler::admin_create_product", skip(app_state, payload, _admin), fields(name = %payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ProductPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  if payload.name.trim().is_empty() {
    return Err(AppError::Validation("Product name is required.".to_string()));
  }
  if payload.price_paise < 0 {
    return Err(AppError::Validation("Price cannot be negative.".to_string()));
  }

  let product: Product = sqlx::query_as(&format!(
    "INSERT INTO products (name, description, category, sizes, price_paise, stock_quantity) \
     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
    PRODUCT_COLUMNS
  ))
  .bind(&payload.name)
  .bind(&payload.description)
  .bind(&payload.category)
  .bind(&payload.sizes)
  .bind(payload.price_paise)
  .bind(payload.stock_quantity)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(product_id = %product.id, "product created");
  Ok(HttpResponse::Created().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, payload, _admin))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<ProductPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product: Option<Product> = sqlx::query_as(&format!(
    "UPDATE products SET name = $1, description = $2, category = $3, sizes = $4, price_paise = $5, \
     stock_quantity = $6, updated_at = now() WHERE id = $7 RETURNING {}",
    PRODUCT_COLUMNS
  ))
  .bind(&payload.name)
  .bind(&payload.description)
  .bind(&payload.category)
  .bind(&payload.sizes)
  .bind(payload.price_paise)
  .bind(payload.stock_quantity)
  .bind(product_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match product {
    Some(product) => Ok(HttpResponse::Ok().json(json!({ "product": product }))),
    None => Err(AppError::NotFound(format!("Product {} not found.", product_id))),
  }
}

#[instrument(name = "handler::admin_delete_product", skip(app_state, _admin))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Product {} not found.", product_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Product deleted."})))
}
