//! Order/shipment status transitions.
//!
//! The transition itself is a pure function over in-memory records; the
//! status pipeline applies it and persists both records in one transaction.
//! The endpoint accepts any target stage (the admin UI constrains direction
//! with its forward/backward buttons), so nothing here validates that a
//! transition follows the linear pending → delivered sequence.

use chrono::{DateTime, Utc};

use crate::models::{FulfillmentStatus, Order, Shipment};
use crate::services::invoice;

/// Optional metadata supplied alongside a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionMeta {
  pub carrier: Option<String>,
  pub packaging_provider: Option<String>,
  pub tracking_id: Option<String>,
}

/// What the transition changed, for logging and the HTTP response.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
  pub target: FulfillmentStatus,
  pub invoice_no_assigned: Option<String>,
  pub stamped_now: bool,
}

fn stamp(slot: &mut Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
  // Stage timestamps are written exactly once; repeating a transition must
  // not move them.
  if slot.is_none() {
    *slot = Some(now);
    true
  } else {
    false
  }
}

/// Applies `target` to both records: shared status, at-most-once stage
/// timestamps, invoice-number assignment, and shipment metadata.
pub fn apply_transition(
  order: &mut Order,
  shipment: &mut Shipment,
  target: FulfillmentStatus,
  meta: &TransitionMeta,
  now: DateTime<Utc>,
) -> TransitionOutcome {
  order.status = target;
  shipment.status = target;

  let stamped_now = match target {
    FulfillmentStatus::Pending => false,
    FulfillmentStatus::Fulfilled => {
      let s = stamp(&mut order.fulfilled_at, now);
      shipment.fulfilled_at = order.fulfilled_at;
      s
    }
    FulfillmentStatus::Shipped => {
      let s = stamp(&mut order.shipped_at, now);
      shipment.shipped_at = order.shipped_at;
      s
    }
    FulfillmentStatus::OutForDelivery => {
      let s = stamp(&mut order.out_for_delivery_at, now);
      shipment.out_for_delivery_at = order.out_for_delivery_at;
      s
    }
    FulfillmentStatus::Delivered => {
      let s = stamp(&mut order.delivered_at, now);
      shipment.delivered_at = order.delivered_at;
      s
    }
  };

  // Invoices get their number at fulfillment; an order moved straight to
  // shipped still needs one for the generated PDF.
  let mut invoice_no_assigned = None;
  if matches!(target, FulfillmentStatus::Fulfilled | FulfillmentStatus::Shipped) && order.invoice_no.is_none() {
    let no = invoice::next_invoice_number(now);
    order.invoice_no = Some(no.clone());
    invoice_no_assigned = Some(no);
  }

  if meta.carrier.is_some() {
    shipment.carrier = meta.carrier.clone();
  }
  if meta.packaging_provider.is_some() {
    shipment.packaging_provider = meta.packaging_provider.clone();
  }
  if meta.tracking_id.is_some() {
    shipment.tracking_id = meta.tracking_id.clone();
  }

  order.updated_at = now;
  shipment.updated_at = now;

  TransitionOutcome {
    target,
    invoice_no_assigned,
    stamped_now,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{OrderItem, PaymentStatus};
  use chrono::Duration;
  use sqlx::types::Json;
  use uuid::Uuid;

  fn order_and_shipment() -> (Order, Shipment) {
    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let order = Order {
      id: order_id,
      customer_id,
      customer_ref: "CUST-7".to_string(),
      items: Json(vec![OrderItem {
        title: "Linen Kurta".to_string(),
        quantity: 1,
        size: "L".to_string(),
        unit_price_paise: 149_900,
      }]),
      ship_name: "A. Mehta".to_string(),
      ship_phone: "9876543210".to_string(),
      ship_address: "12 MG Road".to_string(),
      ship_city: "Pune".to_string(),
      ship_state: "MH".to_string(),
      ship_pincode: "411001".to_string(),
      total_paise: 149_900,
      payment_status: PaymentStatus::Prepaid,
      status: FulfillmentStatus::Pending,
      fulfilled_at: None,
      shipped_at: None,
      out_for_delivery_at: None,
      delivered_at: None,
      invoice_no: None,
      archived: false,
      created_at: now,
      updated_at: now,
    };
    let shipment = Shipment {
      id: Uuid::new_v4(),
      order_id,
      customer_id,
      status: FulfillmentStatus::Pending,
      tracking_id: None,
      carrier: None,
      packaging_provider: None,
      fulfilled_at: None,
      shipped_at: None,
      out_for_delivery_at: None,
      delivered_at: None,
      created_at: now,
      updated_at: now,
    };
    (order, shipment)
  }

  #[test]
  fn shipped_stamps_both_records_identically() {
    let (mut order, mut shipment) = order_and_shipment();
    let now = Utc::now();

    let outcome = apply_transition(&mut order, &mut shipment, FulfillmentStatus::Shipped, &Default::default(), now);

    assert!(outcome.stamped_now);
    assert_eq!(order.status, FulfillmentStatus::Shipped);
    assert_eq!(shipment.status, FulfillmentStatus::Shipped);
    assert_eq!(order.shipped_at, Some(now));
    assert_eq!(shipment.shipped_at, order.shipped_at);
    assert!(order.invoice_no.is_some());
  }

  #[test]
  fn repeated_shipped_call_does_not_overwrite_timestamp() {
    let (mut order, mut shipment) = order_and_shipment();
    let first = Utc::now();
    apply_transition(&mut order, &mut shipment, FulfillmentStatus::Shipped, &Default::default(), first);
    let first_invoice = order.invoice_no.clone();

    let later = first + Duration::hours(6);
    let outcome = apply_transition(&mut order, &mut shipment, FulfillmentStatus::Shipped, &Default::default(), later);

    assert!(!outcome.stamped_now);
    assert_eq!(order.shipped_at, Some(first));
    assert_eq!(shipment.shipped_at, Some(first));
    // The invoice number survives too.
    assert_eq!(order.invoice_no, first_invoice);
    assert!(outcome.invoice_no_assigned.is_none());
  }

  #[test]
  fn fulfilled_assigns_invoice_number_once() {
    let (mut order, mut shipment) = order_and_shipment();
    let now = Utc::now();

    let outcome =
      apply_transition(&mut order, &mut shipment, FulfillmentStatus::Fulfilled, &Default::default(), now);
    let assigned = outcome.invoice_no_assigned.clone().unwrap();
    assert_eq!(order.invoice_no.as_deref(), Some(assigned.as_str()));
    assert_eq!(order.fulfilled_at, Some(now));
    assert_eq!(shipment.fulfilled_at, Some(now));

    let again = apply_transition(
      &mut order,
      &mut shipment,
      FulfillmentStatus::Fulfilled,
      &Default::default(),
      now + Duration::minutes(1),
    );
    assert!(again.invoice_no_assigned.is_none());
  }

  #[test]
  fn metadata_lands_on_the_shipment() {
    let (mut order, mut shipment) = order_and_shipment();
    let meta = TransitionMeta {
      carrier: Some("BlueDart".to_string()),
      packaging_provider: Some("PackRight".to_string()),
      tracking_id: Some("BD123456".to_string()),
    };
    apply_transition(&mut order, &mut shipment, FulfillmentStatus::OutForDelivery, &meta, Utc::now());

    assert_eq!(shipment.carrier.as_deref(), Some("BlueDart"));
    assert_eq!(shipment.packaging_provider.as_deref(), Some("PackRight"));
    assert_eq!(shipment.tracking_id.as_deref(), Some("BD123456"));
    assert_eq!(shipment.status, FulfillmentStatus::OutForDelivery);
  }

  #[test]
  fn delivered_stamps_delivered_at_only() {
    let (mut order, mut shipment) = order_and_shipment();
    let now = Utc::now();
    apply_transition(&mut order, &mut shipment, FulfillmentStatus::Delivered, &Default::default(), now);

    assert_eq!(order.delivered_at, Some(now));
    assert!(order.shipped_at.is_none());
    assert!(order.invoice_no.is_none());
    assert_eq!(shipment.delivered_at, Some(now));
  }
}
