//! Admin order management: list/filter/sort, CRUD, bulk actions, the status
//! transition endpoint, invoice download, and CSV import/export.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle::TransitionMeta;
use crate::models::customer::CUSTOMER_COLUMNS;
use crate::models::order::{compute_total_paise, ORDER_COLUMNS};
use crate::models::shipment::SHIPMENT_COLUMNS;
use crate::models::{Customer, FulfillmentStatus, Order, OrderItem, PaymentStatus, Shipment};
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutPayload, StatusCtxData};
use crate::services::{csv_io, invoice};
use crate::state::AppState;
use crate::web::extractors::AdminSession;
use darzi_flow::{ContextData, FlowOutcome};

use super::admin_customer_handlers::BulkAction;

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub status: Option<FulfillmentStatus>,
  pub payment_status: Option<PaymentStatus>,
  pub archived: Option<bool>,
  pub search: Option<String>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
  pub sort: Option<String>,
  pub order: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

fn sort_clause(sort: Option<&str>, order: Option<&str>) -> Result<String, AppError> {
  let column = match sort.unwrap_or("created_at") {
    "created_at" => "created_at",
    "total" => "total_paise",
    "status" => "status",
    other => return Err(AppError::Validation(format!("Cannot sort orders by '{}'.", other))),
  };
  let direction = match order.unwrap_or("desc") {
    "asc" => "ASC",
    "desc" => "DESC",
    other => return Err(AppError::Validation(format!("Invalid sort order '{}'.", other))),
  };
  Ok(format!("{} {}", column, direction))
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, query, _admin))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let sort = sort_clause(query.sort.as_deref(), query.order.as_deref())?;
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders \
     WHERE ($1::fulfillment_status IS NULL OR status = $1) \
       AND ($2::payment_status IS NULL OR payment_status = $2) \
       AND ($3::boolean IS NULL OR archived = $3) \
       AND ($4::text IS NULL OR customer_ref ILIKE '%' || $4 || '%' OR ship_name ILIKE '%' || $4 || '%' OR ship_phone ILIKE '%' || $4 || '%') \
       AND ($5::timestamptz IS NULL OR created_at >= $5) \
       AND ($6::timestamptz IS NULL OR created_at <= $6) \
     ORDER BY {} LIMIT $7 OFFSET $8",
    ORDER_COLUMNS, sort
  ))
  .bind(query.status)
  .bind(query.payment_status)
  .bind(query.archived)
  .bind(&query.search)
  .bind(query.from)
  .bind(query.to)
  .bind(query.limit.unwrap_or(50).clamp(1, 500))
  .bind(query.offset.unwrap_or(0).max(0))
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::admin_get_order", skip(app_state, _admin))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(order_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let order = order.ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;

  let shipment: Option<Shipment> =
    sqlx::query_as(&format!("SELECT {} FROM shipments WHERE order_id = $1", SHIPMENT_COLUMNS))
      .bind(order_id)
      .fetch_optional(&app_state.db_pool)
      .await?;

  Ok(HttpResponse::Ok().json(json!({ "order": order, "shipment": shipment })))
}

/// Manual order entry reuses the checkout flow (minus any coupon), so totals
/// are recomputed and the shipment is created the same way.
#[instrument(name = "handler::admin_create_order", skip(app_state, payload, _admin))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let mut payload = payload.into_inner();
  payload.coupon_code = None;

  let ctx = ContextData::new(CheckoutCtxData::new(app_state.get_ref().clone(), payload));
  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Order creation finished without an order.".to_string()))?;
      info!(order_id = %order.id, "manual order created");
      Ok(HttpResponse::Created().json(json!({ "order": order, "shipment": guard.shipment })))
    }
    FlowOutcome::Halted => Err(AppError::Internal("Order creation was halted.".to_string())),
  }
}

#[derive(Deserialize, Debug)]
pub struct UpdateOrderPayload {
  pub payment_status: Option<PaymentStatus>,
  pub archived: Option<bool>,
  pub items: Option<Vec<OrderItem>>,
  pub ship_name: Option<String>,
  pub ship_phone: Option<String>,
  pub ship_address: Option<String>,
  pub ship_city: Option<String>,
  pub ship_state: Option<String>,
  pub ship_pincode: Option<String>,
}

#[instrument(name = "handler::admin_update_order", skip(app_state, payload, _admin))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateOrderPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();

  // Editing the items re-derives the stored total; the client never sets it.
  let recomputed_total = payload.items.as_deref().map(compute_total_paise);

  let order: Option<Order> = sqlx::query_as(&format!(
    "UPDATE orders SET \
       payment_status = COALESCE($1, payment_status), \
       archived = COALESCE($2, archived), \
       items = COALESCE($3, items), \
       total_paise = COALESCE($4, total_paise), \
       ship_name = COALESCE($5, ship_name), \
       ship_phone = COALESCE($6, ship_phone), \
       ship_address = COALESCE($7, ship_address), \
       ship_city = COALESCE($8, ship_city), \
       ship_state = COALESCE($9, ship_state), \
       ship_pincode = COALESCE($10, ship_pincode), \
       updated_at = now() \
     WHERE id = $11 RETURNING {}",
    ORDER_COLUMNS
  ))
  .bind(payload.payment_status)
  .bind(payload.archived)
  .bind(payload.items.as_ref().map(Json))
  .bind(recomputed_total)
  .bind(&payload.ship_name)
  .bind(&payload.ship_phone)
  .bind(&payload.ship_address)
  .bind(&payload.ship_city)
  .bind(&payload.ship_state)
  .bind(&payload.ship_pincode)
  .bind(order_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match order {
    Some(order) => Ok(HttpResponse::Ok().json(json!({ "order": order }))),
    None => Err(AppError::NotFound(format!("Order {} not found.", order_id))),
  }
}

#[instrument(name = "handler::admin_delete_order", skip(app_state, _admin))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let result = sqlx::query("DELETE FROM orders WHERE id = $1")
    .bind(order_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Order {} not found.", order_id)));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Order deleted."})))
}

#[derive(Deserialize, Debug)]
pub struct BulkOrdersPayload {
  pub action: BulkAction,
  pub ids: Vec<Uuid>,
}

#[instrument(name = "handler::admin_bulk_orders", skip(app_state, payload, _admin), fields(count = payload.ids.len()))]
pub async fn bulk_orders_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<BulkOrdersPayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  if payload.ids.is_empty() {
    return Err(AppError::Validation("No order ids given.".to_string()));
  }

  let affected = match payload.action {
    BulkAction::Archive => {
      sqlx::query("UPDATE orders SET archived = TRUE, updated_at = now() WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
    BulkAction::Unarchive => {
      sqlx::query("UPDATE orders SET archived = FALSE, updated_at = now() WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
    BulkAction::Delete => {
      sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected()
    }
  };

  info!(affected, "bulk order action applied");
  Ok(HttpResponse::Ok().json(json!({"affected": affected})))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
  pub status: FulfillmentStatus,
  pub carrier: Option<String>,
  pub packaging_provider: Option<String>,
  pub tracking_id: Option<String>,
}

/// The status transition endpoint: runs the status flow, which stamps both
/// records, generates the invoice on `shipped`, and sends the stage email.
#[instrument(name = "handler::admin_update_order_status", skip(app_state, payload, _admin), fields(target = ?payload.status))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<StatusUpdatePayload>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let payload = payload.into_inner();

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
      warn!(order_id = %order_id, "status flow halted unexpectedly");
      Err(AppError::Internal("Status update was halted.".to_string()))
    }
  }
}

/// Serves the stored PDF when a fresh one exists, rendering (and persisting)
/// on demand otherwise.
#[instrument(name = "handler::admin_download_invoice", skip(app_state, _admin))]
pub async fn download_invoice_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();

  let (invoice_no, pdf_bytes) = match invoice::fetch_unexpired_pdf(&app_state.db_pool, order_id).await? {
    Some(found) => found,
    None => {
      let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
        .bind(order_id)
        .fetch_optional(&app_state.db_pool)
        .await?;
      let order = order.ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
      let invoice_no = order.invoice_no.clone().ok_or_else(|| {
        AppError::Validation("Order has no invoice yet; mark it fulfilled or shipped first.".to_string())
      })?;

      let shipment: Option<Shipment> =
        sqlx::query_as(&format!("SELECT {} FROM shipments WHERE order_id = $1", SHIPMENT_COLUMNS))
          .bind(order_id)
          .fetch_optional(&app_state.db_pool)
          .await?;

      let html = invoice::render_invoice_html(&order, shipment.as_ref());
      let pdf_bytes = app_state.pdf.render_pdf(&html).await?;
      if let Err(e) = invoice::persist_invoice(&app_state.db_pool, order_id, &invoice_no, &pdf_bytes).await {
        warn!(order_id = %order_id, error = %e, "failed to persist freshly rendered invoice");
      }
      (invoice_no, pdf_bytes)
    }
  };

  Ok(
    HttpResponse::Ok()
      .content_type("application/pdf")
      .insert_header((
        "Content-Disposition",
        format!("attachment; filename=\"{}.pdf\"", invoice_no),
      ))
      .body(pdf_bytes),
  )
}

#[instrument(name = "handler::admin_import_orders", skip(app_state, body, _admin), fields(bytes = body.len()))]
pub async fn import_orders_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let parsed = csv_io::parse_order_csv(&body)?;

  let mut imported = 0usize;
  let mut errors = parsed.errors;
  for row in parsed.rows {
    let customer: Option<Customer> =
      sqlx::query_as(&format!("SELECT {} FROM customers WHERE phone = $1", CUSTOMER_COLUMNS))
        .bind(&row.customer_phone)
        .fetch_optional(&app_state.db_pool)
        .await?;

    let Some(customer) = customer else {
      errors.push(csv_io::RowError {
        row: row.row,
        message: format!("no customer with phone {}", row.customer_phone),
      });
      continue;
    };

    let items = vec![OrderItem {
      title: row.title.clone(),
      quantity: row.quantity,
      size: row.size.clone(),
      unit_price_paise: row.unit_price_paise,
    }];
    let total_paise = compute_total_paise(&items);

    let mut tx = app_state.db_pool.begin().await?;
    let insert = async {
      let order: Order = sqlx::query_as(&format!(
        "INSERT INTO orders (customer_id, customer_ref, items, ship_name, ship_phone, ship_address, \
         ship_city, ship_state, ship_pincode, total_paise, payment_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
        ORDER_COLUMNS
      ))
      .bind(customer.id)
      .bind(&customer.code)
      .bind(Json(&items))
      .bind(&customer.name)
      .bind(&customer.phone)
      .bind(&customer.address)
      .bind(&customer.city)
      .bind(&customer.state)
      .bind(&customer.pincode)
      .bind(total_paise)
      .bind(row.payment_status)
      .fetch_one(&mut *tx)
      .await?;

      sqlx::query("INSERT INTO shipments (order_id, customer_id) VALUES ($1, $2)")
        .bind(order.id)
        .bind(customer.id)
        .execute(&mut *tx)
        .await?;
      Ok::<_, sqlx::Error>(())
    }
    .await;

    match insert {
      Ok(()) => {
        tx.commit().await?;
        imported += 1;
      }
      Err(e) => {
        let _ = tx.rollback().await;
        warn!(row = row.row, error = %e, "order row import failed");
        errors.push(csv_io::RowError {
          row: row.row,
          message: format!("database error: {}", e),
        });
      }
    }
  }

  info!(imported, errors = errors.len(), "order CSV import finished");
  Ok(HttpResponse::Ok().json(json!({"imported": imported, "errors": errors})))
}

#[instrument(name = "handler::admin_export_orders", skip(app_state, _admin))]
pub async fn export_orders_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let orders: Vec<Order> = sqlx::query_as(&format!("SELECT {} FROM orders ORDER BY created_at ASC", ORDER_COLUMNS))
    .fetch_all(&app_state.db_pool)
    .await?;

  let csv = csv_io::orders_to_csv(&orders)?;
  Ok(
    HttpResponse::Ok()
      .content_type("text/csv; charset=utf-8")
      .insert_header(("Content-Disposition", "attachment; filename=\"orders.csv\""))
      .body(csv),
  )
}
