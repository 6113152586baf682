//! Invoice numbering, HTML rendering, and stored-PDF persistence.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Order, Shipment, StoredInvoice};

/// Stored invoice PDFs expire three months after creation.
const INVOICE_TTL_DAYS: i64 = 90;

/// GST is itemised on the invoice but currently charged at 0%.
const GST_RATE_PERCENT: i64 = 0;

/// `INV-<yearmonth>-<4-digit-random>`. Uniqueness is enforced only by the
/// database's unique index; a collision surfaces as an insert error.
pub fn next_invoice_number(now: DateTime<Utc>) -> String {
  let suffix: u32 = rand::rng().random_range(0..10_000);
  format!("INV-{}-{:04}", now.format("%Y%m"), suffix)
}

fn format_paise(paise: i64) -> String {
  format!("\u{20b9}{}.{:02}", paise / 100, (paise % 100).abs())
}

/// Renders the printable invoice document for an order. Pure; the PDF
/// renderer rasterizes the returned HTML.
pub fn render_invoice_html(order: &Order, shipment: Option<&Shipment>) -> String {
  let invoice_no = order.invoice_no.as_deref().unwrap_or("DRAFT");
  let carrier = shipment
    .and_then(|s| s.carrier.as_deref())
    .unwrap_or("To be assigned");

  let mut rows = String::new();
  for (idx, item) in order.items.0.iter().enumerate() {
    rows.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
      idx + 1,
      item.title,
      item.size,
      item.quantity,
      format_paise(item.unit_price_paise),
      format_paise(item.subtotal_paise()),
    ));
  }

  let subtotal = order.total_paise;
  let gst = subtotal * GST_RATE_PERCENT / 100;
  let grand_total = subtotal + gst;

  format!(
    r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body {{ font-family: Georgia, serif; color: #1c1c1c; margin: 40px; }}
  header {{ border-bottom: 3px solid #14213d; padding-bottom: 12px; margin-bottom: 24px; }}
  h1 {{ margin: 0; letter-spacing: 4px; color: #14213d; }}
  .meta {{ float: right; text-align: right; font-size: 13px; }}
  .addresses {{ display: flex; gap: 48px; margin-bottom: 24px; font-size: 13px; }}
  table {{ width: 100%; border-collapse: collapse; font-size: 13px; }}
  th, td {{ border: 1px solid #d0d0d0; padding: 6px 10px; text-align: left; }}
  th {{ background: #f2f2f2; }}
  td.num, th.num {{ text-align: right; }}
  .totals td {{ font-weight: bold; }}
  footer {{ margin-top: 36px; font-size: 11px; color: #6b6b6b; }}
</style>
</head>
<body>
<header>
  <div class="meta">
    <div><strong>Invoice No:</strong> {invoice_no}</div>
    <div><strong>Date:</strong> {date}</div>
    <div><strong>Carrier:</strong> {carrier}</div>
  </div>
  <h1>DARZI</h1>
  <div>Fine menswear, tailored for you</div>
</header>
<div class="addresses">
  <div>
    <strong>Bill To</strong><br>
    {name}<br>
    {address}<br>
    {city} {state} {pincode}<br>
    {phone}
  </div>
  <div>
    <strong>Ship To</strong><br>
    {name}<br>
    {address}<br>
    {city} {state} {pincode}
  </div>
</div>
<table>
  <tr><th>#</th><th>Item</th><th>Size</th><th>Qty</th><th class="num">Unit Price</th><th class="num">Amount</th></tr>
{rows}
  <tr class="totals"><td colspan="5" class="num">Subtotal</td><td class="num">{subtotal}</td></tr>
  <tr class="totals"><td colspan="5" class="num">GST ({gst_rate}%)</td><td class="num">{gst}</td></tr>
  <tr class="totals"><td colspan="5" class="num">Grand Total</td><td class="num">{grand_total}</td></tr>
</table>
<footer>
  Goods once sold are only eligible for exchange within 7 days of delivery.
  Please retain this invoice for warranty and exchange claims. All disputes
  subject to Pune jurisdiction.
</footer>
</body>
</html>"#,
    invoice_no = invoice_no,
    date = order.updated_at.format("%d %b %Y"),
    carrier = carrier,
    name = order.ship_name,
    address = order.ship_address,
    city = order.ship_city,
    state = order.ship_state,
    pincode = order.ship_pincode,
    phone = order.ship_phone,
    rows = rows,
    subtotal = format_paise(subtotal),
    gst_rate = GST_RATE_PERCENT,
    gst = format_paise(gst),
    grand_total = format_paise(grand_total),
  )
}

/// Persists a rendered PDF (base64) with its TTL and purges expired rows.
#[instrument(name = "invoice::persist", skip(pool, pdf_bytes))]
pub async fn persist_invoice(pool: &PgPool, order_id: Uuid, invoice_no: &str, pdf_bytes: &[u8]) -> Result<StoredInvoice> {
  // Opportunistic TTL sweep; Postgres has no TTL index of its own.
  sqlx::query("DELETE FROM invoices WHERE expires_at < now()")
    .execute(pool)
    .await?;

  let expires_at = Utc::now() + Duration::days(INVOICE_TTL_DAYS);
  let stored: StoredInvoice = sqlx::query_as(
    "INSERT INTO invoices (order_id, invoice_no, pdf_base64, expires_at) VALUES ($1, $2, $3, $4)
     RETURNING id, order_id, invoice_no, pdf_base64, created_at, expires_at",
  )
  .bind(order_id)
  .bind(invoice_no)
  .bind(BASE64.encode(pdf_bytes))
  .bind(expires_at)
  .fetch_one(pool)
  .await?;

  info!(invoice_no, order_id = %order_id, "invoice PDF persisted");
  Ok(stored)
}

/// Latest unexpired stored PDF for an order, decoded.
pub async fn fetch_unexpired_pdf(pool: &PgPool, order_id: Uuid) -> Result<Option<(String, Vec<u8>)>> {
  let stored: Option<StoredInvoice> = sqlx::query_as(
    "SELECT id, order_id, invoice_no, pdf_base64, created_at, expires_at
     FROM invoices WHERE order_id = $1 AND expires_at > now()
     ORDER BY created_at DESC LIMIT 1",
  )
  .bind(order_id)
  .fetch_optional(pool)
  .await?;

  match stored {
    Some(inv) => {
      let bytes = BASE64
        .decode(inv.pdf_base64.as_bytes())
        .map_err(|e| AppError::Internal(format!("Corrupt stored invoice PDF: {}", e)))?;
      Ok(Some((inv.invoice_no, bytes)))
    }
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{FulfillmentStatus, OrderItem, PaymentStatus};
  use sqlx::types::Json;

  fn sample_order() -> Order {
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      customer_ref: "CUST-9".to_string(),
      items: Json(vec![
        OrderItem {
          title: "Oxford Shirt".to_string(),
          quantity: 2,
          size: "M".to_string(),
          unit_price_paise: 10_000,
        },
        OrderItem {
          title: "Pocket Square".to_string(),
          quantity: 1,
          size: "OS".to_string(),
          unit_price_paise: 5_000,
        },
      ]),
      ship_name: "R. Iyer".to_string(),
      ship_phone: "9000000000".to_string(),
      ship_address: "4 Brigade Road".to_string(),
      ship_city: "Bengaluru".to_string(),
      ship_state: "KA".to_string(),
      ship_pincode: "560001".to_string(),
      total_paise: 25_000,
      payment_status: PaymentStatus::Prepaid,
      status: FulfillmentStatus::Shipped,
      fulfilled_at: None,
      shipped_at: Some(now),
      out_for_delivery_at: None,
      delivered_at: None,
      invoice_no: Some("INV-202501-0042".to_string()),
      archived: false,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn invoice_number_has_the_expected_shape() {
    let now = Utc::now();
    let no = next_invoice_number(now);
    let expected_prefix = format!("INV-{}-", now.format("%Y%m"));
    assert!(no.starts_with(&expected_prefix), "got {}", no);
    let suffix = &no[expected_prefix.len()..];
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
  }

  #[test]
  fn invoice_html_lists_items_and_totals() {
    let html = render_invoice_html(&sample_order(), None);
    assert!(html.contains("INV-202501-0042"));
    assert!(html.contains("Oxford Shirt"));
    assert!(html.contains("Pocket Square"));
    // Line subtotal, GST row at 0%, and grand total.
    assert!(html.contains("\u{20b9}200.00"));
    assert!(html.contains("GST (0%)"));
    assert!(html.contains("\u{20b9}250.00"));
    assert!(html.contains("Bill To"));
    assert!(html.contains("Ship To"));
  }

  #[test]
  fn draft_invoice_renders_without_a_number() {
    let mut order = sample_order();
    order.invoice_no = None;
    let html = render_invoice_html(&order, None);
    assert!(html.contains("DRAFT"));
  }
}
