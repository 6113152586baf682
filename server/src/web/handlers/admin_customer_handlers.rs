//! Admin customer management: list/filter/sort, CRUD, bulk actions, and CSV
//! import/export.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::customer::CUSTOMER_COLUMNS;
use crate::models::Customer;
use crate::services::csv_io;
use crate::state::AppState;
use crate::web::extractors::AdminSession;

#[derive(Deserialize, Debug)]
pub struct ListCustomersQuery {
  pub search: Option<String>,
  pub archived: Option<bool>,
  pub sort: Option<String>,
  pub order: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

fn sort_clause(sort: Option<&str>, order: Option<&str>) -> Result<String, AppError> {
  let column = match sort.unwrap_or("created_at") {
    "name" => "name",
    "code" => "code",
    "created_at" => "created_at",
    other => {
      return Err(AppError::Validation(format!("Cannot sort customers by '{}'.", other)));
    }
  };
  let direction = match order.unwrap_or("desc") {
    "asc" => "ASC",
    "desc" => "DESC",
    other => return Err(AppError::Validation(format!("Invalid sort order '{}'.", other))),
  };
  Ok(format!("{} {}", column, direction))
}

#[instrument(name = "handler::admin_list_customers", skip(app_state, query, _admin))]
pub async fn list_customers_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListCustomersQuery>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let sort = sort_clause(query.sort.as_deref(), query.order.as_deref())?;
  let customers: Vec<Customer> = sqlx::query_as(&format!(
    "SELECT {} FROM customers \
     WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR phone ILIKE '%' || $1 || '%' OR code ILIKE '%' || $1 || '%') \
       AND ($2::boolean IS NULL OR archived = $2) \
     ORDER BY {} LIMIT $3 OFFSET $4",
    CUSTOMER_COLUMNS, sort
  ))
  .bind(&query.search)
  .bind(query.archived)
  .bind(query.limit.unwrap_or(50).clamp(1, 500))
  .bind(query.offset.unwrap_or(0).max(0))
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "customers": customers })))
}

#[instrument(name = "handler::admin_get_customer", skip(app_state, _admin))]
pub async fn get_customer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let customer_id = path.into_inner();
  let customer: Option<Customer> =
    sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS))
      .bind(customer_id)
      .fetch_optional(&app_state.db_pool)
      .await?;

  match customer {
    Some(customer) => Ok(HttpResponse::Ok().json(json!({ "customer": customer }))),
    None => Err(AppError::NotFound(format!("Customer {} not found.", customer_id))),
  }
}

#[derive(Deserialize, Debug)]
pub struct CustomerPayload {
  pub name: String,
  pub phone: String,
  #[serde(default)]
  pub emails: Vec<String>,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub pincode: String,
}

#[instrument(name = "handler::admin_create_customer", skip(app_state, payload, _admin), fields(phone = %payload.phone))]
pub async fn create_customer_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CustomerPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  if payload.name.trim().is_empty() || payload.phone.trim().is_empty() {
    return Err(AppError::Validation("Name and phone are required.".to_string()));
  }

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE phone = $1)")
    .bind(&payload.phone)
    .fetch_one(&app_state.db_pool)
    .await?;
  if exists {
    return Err(AppError::Conflict(format!(
      "A customer with phone {} already exists.",
      payload.phone
    )));
  }

  let seq: i64 = sqlx::query_scalar("SELECT nextval('customer_code_seq')")
    .fetch_one(&app_state.db_pool)
    .await?;
  let code = format!("CUST-{}", seq);

  let customer: Customer = sqlx::query_as(&format!(
    "INSERT INTO customers (code, name, phone, emails, address, city, state, pincode) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
    CUSTOMER_COLUMNS
  ))
  .bind(&code)
  .bind(&payload.name)
  .bind(&payload.phone)
  .bind(&payload.emails)
  .bind(&payload.address)
  .bind(&payload.city)
  .bind(&payload.state)
  .bind(&payload.pincode)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(code = %customer.code, "customer created");
  Ok(HttpResponse::Created().json(json!({ "customer": customer })))
}

#[instrument(name = "handler::admin_update_customer", skip(app_state, payload, _admin))]
pub async fn update_customer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<CustomerPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let customer_id = path.into_inner();
  let customer: Option<Customer> = sqlx::query_as(&format!(
    "UPDATE customers SET name = $1, phone = $2, emails = $3, address = $4, city = $5, state = $6, \
     pincode = $7, updated_at = now() WHERE id = $8 RETURNING {}",
    CUSTOMER_COLUMNS
  ))
  .bind(&payload.name)
  .bind(&payload.phone)
  .bind(&payload.emails)
  .bind(&payload.address)
  .bind(&payload.city)
  .bind(&payload.state)
  .bind(&payload.pincode)
  .bind(customer_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match customer {
    Some(customer) => Ok(HttpResponse::Ok().json(json!({ "customer": customer }))),
    None => Err(AppError::NotFound(format!("Customer {} not found.", customer_id))),
  }
}

#[instrument(name = "handler::admin_delete_customer", skip(app_state, _admin))]
pub async fn delete_customer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let customer_id = path.into_inner();
  let result = sqlx::query("DELETE FROM customers WHERE id = $1")
    .bind(customer_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Customer {} not found.", customer_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Customer deleted."})))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
  Archive,
  Unarchive,
  Delete,
}

#[derive(Deserialize, Debug)]
pub struct BulkCustomersPayload {
  pub action: BulkAction,
  pub ids: Vec<Uuid>,
}

#[instrument(name = "handler::admin_bulk_customers", skip(app_state, payload, _admin), fields(count = payload.ids.len()))]
pub async fn bulk_customers_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<BulkCustomersPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  if payload.ids.is_empty() {
    return Err(AppError::Validation("No customer ids given.".to_string()));
  }

  let affected = match payload.action {
    BulkAction::Archive => {
      sqlx::query("UPDATE customers SET archived = TRUE, updated_at = now() WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
    BulkAction::Unarchive => {
      sqlx::query("UPDATE customers SET archived = FALSE, updated_at = now() WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
    BulkAction::Delete => {
      sqlx::query("DELETE FROM customers WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
  };

  info!(affected, "bulk customer action applied");
  Ok(HttpResponse::Ok().json(json!({"affected": affected})))
}

#[instrument(name = "handler::admin_import_customers", skip(app_state, body, _admin), fields(bytes = body.len()))]
pub async fn import_customers_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let parsed = csv_io::parse_customer_csv(&body)?;

  let mut imported = 0usize;
  let mut errors = parsed.errors;
  for row in parsed.rows {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM customers WHERE phone = $1")
      .bind(&row.phone)
      .fetch_optional(&app_state.db_pool)
      .await?;

    let result = match existing {
      Some(id) => {
        sqlx::query(
          "UPDATE customers SET name = $1, emails = (SELECT ARRAY(SELECT DISTINCT unnest(array_append(emails, $2)))), \
           address = $3, city = $4, state = $5, pincode = $6, updated_at = now() WHERE id = $7",
        )
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.address)
        .bind(&row.city)
        .bind(&row.state)
        .bind(&row.pincode)
        .bind(id)
        .execute(&app_state.db_pool)
        .await
      }
      None => {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('customer_code_seq')")
          .fetch_one(&app_state.db_pool)
          .await?;
        sqlx::query(
          "INSERT INTO customers (code, name, phone, emails, address, city, state, pincode) \
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(format!("CUST-{}", seq))
        .bind(&row.name)
        .bind(&row.phone)
        .bind(vec![row.email.clone()])
        .bind(&row.address)
        .bind(&row.city)
        .bind(&row.state)
        .bind(&row.pincode)
        .execute(&app_state.db_pool)
        .await
      }
    };

    match result {
      Ok(_) => imported += 1,
      Err(e) => {
        warn!(phone = %row.phone, error = %e, "customer row import failed");
        errors.push(csv_io::RowError {
          row: row.row,
          message: format!("database error for phone {}: {}", row.phone, e),
        });
      }
    }
  }

  info!(imported, errors = errors.len(), "customer CSV import finished");
  Ok(HttpResponse::Ok().json(json!({"imported": imported, "errors": errors})))
}

#[instrument(name = "handler::admin_export_customers", skip(app_state, _admin))]
pub async fn export_customers_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let customers: Vec<Customer> =
    sqlx::query_as(&format!("SELECT {} FROM customers ORDER BY created_at ASC", CUSTOMER_COLUMNS))
      .fetch_all(&app_state.db_pool)
      .await?;

  let csv = csv_io::customers_to_csv(&customers)?;
  Ok(
    HttpResponse::Ok()
      .content_type("text/csv; charset=utf-8")
      .insert_header(("Content-Disposition", "attachment; filename=\"customers.csv\""))
      .body(csv),
  )
}
