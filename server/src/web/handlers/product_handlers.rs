//! Public product browsing.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Product;
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "id, name, description, category, sizes, price_paise, stock_quantity, created_at, updated_at";

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub category: Option<String>,
}

#[instrument(name = "handler::list_products", skip(app_state, query))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let products: Vec<Product> = sqlx::query_as(&format!(
    "SELECT {} FROM products WHERE ($1::text IS NULL OR category = $1) ORDER BY name ASC",
    PRODUCT_COLUMNS
  ))
  .bind(&query.category)
  .fetch_all(&app_state.db_pool)
  .await?;

  info!(count = products.len(), "products fetched");
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::get_product", skip(app_state, path))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();

  let product: Option<Product> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
    .bind(product_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match product {
    Some(product) => Ok(HttpResponse::Ok().json(json!({ "product": product }))),
    None => Err(AppError::NotFound(format!("Product {} not found.", product_id))),
  }
}
