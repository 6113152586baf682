//! CSV bulk import/export for customers and orders.
//!
//! Header names are matched case-insensitively. A file missing a required
//! header is rejected outright with an error listing the missing fields; a
//! row missing a required value lands in the error list with its 1-indexed
//! row number and creates nothing.

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;

use crate::errors::{AppError, Result};
use crate::models::{Customer, Order, PaymentStatus};

pub const CUSTOMER_HEADERS: [&str; 7] = ["name", "phone", "email", "address", "city", "state", "pincode"];
pub const ORDER_HEADERS: [&str; 6] = ["customer_phone", "title", "quantity", "size", "unit_price", "payment_status"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowError {
  /// 1-indexed data row (the header row is not counted).
  pub row: usize,
  pub message: String,
}

#[derive(Debug, Clone)]
pub struct CsvImport<T> {
  pub rows: Vec<T>,
  pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRow {
  /// 1-indexed data row this came from.
  pub row: usize,
  pub name: String,
  pub phone: String,
  pub email: String,
  pub address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
  /// 1-indexed data row this came from, kept so later lookups (e.g. an
  /// unknown customer phone) can still point at the offending row.
  pub row: usize,
  pub customer_phone: String,
  pub title: String,
  pub quantity: i32,
  pub size: String,
  pub unit_price_paise: i64,
  pub payment_status: PaymentStatus,
}

struct HeaderMap {
  indices: Vec<usize>,
}

fn map_headers(headers: &csv::StringRecord, required: &[&str]) -> Result<HeaderMap> {
  let mut indices = Vec::with_capacity(required.len());
  let mut missing = Vec::new();
  for name in required {
    match headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name)) {
      Some(idx) => indices.push(idx),
      None => missing.push(*name),
    }
  }
  if !missing.is_empty() {
    return Err(AppError::Validation(format!(
      "CSV is missing required headers: {}",
      missing.join(", ")
    )));
  }
  Ok(HeaderMap { indices })
}

fn field<'a>(record: &'a csv::StringRecord, map: &HeaderMap, pos: usize) -> &'a str {
  record.get(map.indices[pos]).map(str::trim).unwrap_or("")
}

pub fn parse_customer_csv(data: &[u8]) -> Result<CsvImport<CustomerRow>> {
  let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(data);
  let headers = reader
    .headers()
    .map_err(|e| AppError::Validation(format!("Malformed CSV: {}", e)))?
    .clone();
  let map = map_headers(&headers, &CUSTOMER_HEADERS)?;

  let mut rows = Vec::new();
  let mut errors = Vec::new();
  for (i, record) in reader.records().enumerate() {
    let row_no = i + 1;
    let record = match record {
      Ok(r) => r,
      Err(e) => {
        errors.push(RowError {
          row: row_no,
          message: format!("unreadable row: {}", e),
        });
        continue;
      }
    };

    let mut empty = Vec::new();
    for (pos, name) in CUSTOMER_HEADERS.iter().enumerate() {
      if field(&record, &map, pos).is_empty() {
        empty.push(*name);
      }
    }
    if !empty.is_empty() {
      errors.push(RowError {
        row: row_no,
        message: format!("missing value for: {}", empty.join(", ")),
      });
      continue;
    }

    rows.push(CustomerRow {
      row: row_no,
      name: field(&record, &map, 0).to_string(),
      phone: field(&record, &map, 1).to_string(),
      email: field(&record, &map, 2).to_string(),
      address: field(&record, &map, 3).to_string(),
      city: field(&record, &map, 4).to_string(),
      state: field(&record, &map, 5).to_string(),
      pincode: field(&record, &map, 6).to_string(),
    });
  }

  Ok(CsvImport { rows, errors })
}

fn parse_price_rupees(raw: &str) -> Option<i64> {
  let value: f64 = raw.parse().ok()?;
  if !value.is_finite() || value < 0.0 {
    return None;
  }
  Some((value * 100.0).round() as i64)
}

pub fn parse_order_csv(data: &[u8]) -> Result<CsvImport<OrderRow>> {
  let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(data);
  let headers = reader
    .headers()
    .map_err(|e| AppError::Validation(format!("Malformed CSV: {}", e)))?
    .clone();
  let map = map_headers(&headers, &ORDER_HEADERS)?;

  let mut rows = Vec::new();
  let mut errors = Vec::new();
  for (i, record) in reader.records().enumerate() {
    let row_no = i + 1;
    let record = match record {
      Ok(r) => r,
      Err(e) => {
        errors.push(RowError {
          row: row_no,
          message: format!("unreadable row: {}", e),
        });
        continue;
      }
    };

    let customer_phone = field(&record, &map, 0);
    let title = field(&record, &map, 1);
    let quantity_raw = field(&record, &map, 2);
    let size = field(&record, &map, 3);
    let unit_price_raw = field(&record, &map, 4);
    let payment_raw = field(&record, &map, 5);

    let mut problems = Vec::new();
    if customer_phone.is_empty() {
      problems.push("missing value for: customer_phone".to_string());
    }
    if title.is_empty() {
      problems.push("missing value for: title".to_string());
    }
    let quantity = quantity_raw.parse::<i32>().ok().filter(|q| *q > 0);
    if quantity.is_none() {
      problems.push(format!("invalid quantity '{}'", quantity_raw));
    }
    let unit_price_paise = parse_price_rupees(unit_price_raw);
    if unit_price_paise.is_none() {
      problems.push(format!("invalid unit_price '{}'", unit_price_raw));
    }
    let payment_status = match payment_raw.to_ascii_lowercase().as_str() {
      "prepaid" => Some(PaymentStatus::Prepaid),
      "unpaid" => Some(PaymentStatus::Unpaid),
      _ => None,
    };
    if payment_status.is_none() {
      problems.push(format!("invalid payment_status '{}'", payment_raw));
    }

    if !problems.is_empty() {
      errors.push(RowError {
        row: row_no,
        message: problems.join("; "),
      });
      continue;
    }

    rows.push(OrderRow {
      row: row_no,
      customer_phone: customer_phone.to_string(),
      title: title.to_string(),
      quantity: quantity.unwrap_or(1),
      size: if size.is_empty() { "OS".to_string() } else { size.to_string() },
      unit_price_paise: unit_price_paise.unwrap_or(0),
      payment_status: payment_status.unwrap_or(PaymentStatus::Unpaid),
    });
  }

  Ok(CsvImport { rows, errors })
}

pub fn customers_to_csv(customers: &[Customer]) -> Result<String> {
  let mut writer = WriterBuilder::new().from_writer(Vec::new());
  writer
    .write_record(["code", "name", "phone", "email", "address", "city", "state", "pincode", "archived"])
    .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  for c in customers {
    writer
      .write_record([
        c.code.as_str(),
        c.name.as_str(),
        c.phone.as_str(),
        c.emails.first().map(String::as_str).unwrap_or(""),
        c.address.as_str(),
        c.city.as_str(),
        c.state.as_str(),
        c.pincode.as_str(),
        if c.archived { "true" } else { "false" },
      ])
      .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  }
  let bytes = writer
    .into_inner()
    .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))
}

pub fn orders_to_csv(orders: &[Order]) -> Result<String> {
  let mut writer = WriterBuilder::new().from_writer(Vec::new());
  writer
    .write_record(["order_id", "customer_ref", "items", "total_rupees", "payment_status", "status", "invoice_no", "created_at"])
    .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  for o in orders {
    let items = o
      .items
      .0
      .iter()
      .map(|i| format!("{} x{} ({})", i.title, i.quantity, i.size))
      .collect::<Vec<_>>()
      .join("; ");
    let total = format!("{}.{:02}", o.total_paise / 100, (o.total_paise % 100).abs());
    let payment = match o.payment_status {
      PaymentStatus::Prepaid => "prepaid",
      PaymentStatus::Unpaid => "unpaid",
    };
    writer
      .write_record([
        o.id.to_string().as_str(),
        o.customer_ref.as_str(),
        items.as_str(),
        total.as_str(),
        payment,
        o.status.label(),
        o.invoice_no.as_deref().unwrap_or(""),
        o.created_at.to_rfc3339().as_str(),
      ])
      .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  }
  let bytes = writer
    .into_inner()
    .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
  String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn customer_import_accepts_case_insensitive_headers() {
    let csv = "Name,PHONE,Email,Address,City,State,Pincode\n\
               Arjun Rao,9876543210,arjun@example.com,5 FC Road,Pune,MH,411004\n";
    let parsed = parse_customer_csv(csv.as_bytes()).unwrap();
    assert_eq!(parsed.errors, vec![]);
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].phone, "9876543210");
  }

  #[test]
  fn missing_header_rejects_the_whole_file() {
    let csv = "name,email,address,city,state,pincode\nA,a@x.com,addr,c,s,1\n";
    let err = parse_customer_csv(csv.as_bytes()).unwrap_err();
    match err {
      AppError::Validation(msg) => assert!(msg.contains("phone"), "got {}", msg),
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn row_with_missing_field_is_reported_with_its_number_and_skipped() {
    let csv = "name,phone,email,address,city,state,pincode\n\
               Arjun Rao,9876543210,arjun@example.com,5 FC Road,Pune,MH,411004\n\
               Missing Phone,,missing@example.com,1 Lane,Pune,MH,411001\n\
               Kiran Shah,9000000001,kiran@example.com,2 Lane,Pune,MH,411002\n";
    let parsed = parse_customer_csv(csv.as_bytes()).unwrap();
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].row, 2);
    assert!(parsed.errors[0].message.contains("phone"));
  }

  #[test]
  fn order_import_parses_prices_into_paise() {
    let csv = "customer_phone,title,quantity,size,unit_price,payment_status\n\
               9876543210,Oxford Shirt,2,M,100,prepaid\n\
               9876543210,Pocket Square,1,OS,49.50,unpaid\n";
    let parsed = parse_order_csv(csv.as_bytes()).unwrap();
    assert_eq!(parsed.errors, vec![]);
    assert_eq!(parsed.rows[0].unit_price_paise, 10_000);
    assert_eq!(parsed.rows[1].unit_price_paise, 4_950);
    assert_eq!(parsed.rows[0].payment_status, PaymentStatus::Prepaid);
  }

  #[test]
  fn order_row_with_bad_quantity_is_reported() {
    let csv = "customer_phone,title,quantity,size,unit_price,payment_status\n\
               9876543210,Oxford Shirt,zero,M,100,prepaid\n";
    let parsed = parse_order_csv(csv.as_bytes()).unwrap();
    assert!(parsed.rows.is_empty());
    assert_eq!(parsed.errors[0].row, 1);
    assert!(parsed.errors[0].message.contains("quantity"));
  }

  #[test]
  fn customer_export_round_trips_through_the_importer() {
    use chrono::Utc;
    use uuid::Uuid;
    let customers = vec![Customer {
      id: Uuid::new_v4(),
      code: "CUST-1".to_string(),
      name: "Arjun Rao".to_string(),
      phone: "9876543210".to_string(),
      emails: vec!["arjun@example.com".to_string()],
      address: "5 FC Road".to_string(),
      city: "Pune".to_string(),
      state: "MH".to_string(),
      pincode: "411004".to_string(),
      archived: false,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }];
    let exported = customers_to_csv(&customers).unwrap();
    let parsed = parse_customer_csv(exported.as_bytes()).unwrap();
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].name, "Arjun Rao");
  }
}
