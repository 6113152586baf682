//! Back-office analytics: aggregates over orders, customers, and feedback.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::FulfillmentStatus;
use crate::state::AppState;
use crate::web::extractors::AdminSession;

#[derive(Deserialize, Debug)]
pub struct AnalyticsQuery {
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, FromRow)]
struct StatusCount {
  status: FulfillmentStatus,
  count: i64,
}

#[derive(Debug, Serialize, FromRow)]
struct TopItem {
  title: String,
  quantity: i64,
}

#[instrument(name = "handler::admin_analytics", skip(app_state, query, _admin))]
pub async fn analytics_handler(
  app_state: web::Data<AppState>,
  query: web::Query<AnalyticsQuery>,
  _admin: AdminSession,
) -> Result<HttpResponse, AppError> {
  let to = query.to.unwrap_or_else(Utc::now);
  let from = query.from.unwrap_or(to - Duration::days(30));

  let (total_orders, total_revenue_paise): (i64, i64) = sqlx::query_as(
    "SELECT count(*), COALESCE(sum(total_paise), 0)::bigint FROM orders \
     WHERE created_at BETWEEN $1 AND $2 AND archived = FALSE",
  )
  .bind(from)
  .bind(to)
  .fetch_one(&app_state.db_pool)
  .await?;

  let status_counts: Vec<StatusCount> = sqlx::query_as(
    "SELECT status, count(*) AS count FROM orders \
     WHERE created_at BETWEEN $1 AND $2 AND archived = FALSE GROUP BY status",
  )
  .bind(from)
  .bind(to)
  .fetch_all(&app_state.db_pool)
  .await?;

  let new_customers: i64 =
    sqlx::query_scalar("SELECT count(*) FROM customers WHERE created_at BETWEEN $1 AND $2")
      .bind(from)
      .bind(to)
      .fetch_one(&app_state.db_pool)
      .await?;

  let top_items: Vec<TopItem> = sqlx::query_as(
    "SELECT item->>'title' AS title, sum((item->>'quantity')::bigint)::bigint AS quantity \
     FROM orders, jsonb_array_elements(items) AS item \
     WHERE created_at BETWEEN $1 AND $2 AND archived = FALSE \
     GROUP BY 1 ORDER BY 2 DESC LIMIT 5",
  )
  .bind(from)
  .bind(to)
  .fetch_all(&app_state.db_pool)
  .await?;

  let avg_ratings: Option<(Option<f64>, Option<f64>, Option<f64>, Option<f64>)> = sqlx::query_as(
    "SELECT avg(fit_rating)::float8, avg(quality_rating)::float8, \
            avg(delivery_rating)::float8, avg(service_rating)::float8 \
     FROM feedback WHERE submitted_at BETWEEN $1 AND $2",
  )
  .bind(from)
  .bind(to)
  .fetch_optional(&app_state.db_pool)
  .await?;
  let (avg_fit, avg_quality, avg_delivery, avg_service) = avg_ratings.unwrap_or((None, None, None, None));

  Ok(HttpResponse::Ok().json(json!({
    "from": from,
    "to": to,
    "totalOrders": total_orders,
    "totalRevenuePaise": total_revenue_paise,
    "statusCounts": status_counts,
    "newCustomers": new_customers,
    "topItems": top_items,
    "feedbackAverages": {
      "fit": avg_fit,
      "quality": avg_quality,
      "delivery": avg_delivery,
      "service": avg_service,
    },
  })))
}
