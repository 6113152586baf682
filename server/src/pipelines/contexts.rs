//! Underlying data structs for every flow. Handlers receive these wrapped in
//! `darzi_flow::ContextData`.

use serde::Deserialize;
use uuid::Uuid;

use crate::lifecycle::TransitionMeta;
use crate::models::{Coupon, Customer, FulfillmentStatus, Order, OrderItem, PaymentStatus, Shipment};
use crate::state::AppState;

// --- Order status transition ---

#[derive(Clone)]
pub struct StatusCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub target: FulfillmentStatus,
  pub meta: TransitionMeta,
  // Populated by the flow:
  pub order: Option<Order>,
  pub shipment: Option<Shipment>,
  pub customer: Option<Customer>,
  pub invoice_pdf: Option<Vec<u8>>,
  pub email_sent: bool,
}

impl StatusCtxData {
  pub fn new(app_state: AppState, order_id: Uuid, target: FulfillmentStatus, meta: TransitionMeta) -> Self {
    Self {
      app_state,
      order_id,
      target,
      meta,
      order: None,
      shipment: None,
      customer: None,
      invoice_pdf: None,
      email_sent: false,
    }
  }
}

// --- Checkout ---

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutCustomer {
  pub name: String,
  pub phone: String,
  pub email: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub pincode: String,
}

/// What the storefront posts at checkout. Any client-supplied total is
/// ignored; the flow recomputes it from the line items.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutPayload {
  pub items: Vec<OrderItem>,
  pub customer: CheckoutCustomer,
  pub coupon_code: Option<String>,
  pub payment_status: PaymentStatus,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub payload: CheckoutPayload,
  // Populated by the flow:
  pub coupon: Option<Coupon>,
  pub total_paise: i64,
  pub customer: Option<Customer>,
  pub order: Option<Order>,
  pub shipment: Option<Shipment>,
  pub confirmation_email_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, payload: CheckoutPayload) -> Self {
    Self {
      app_state,
      payload,
      coupon: None,
      total_paise: 0,
      customer: None,
      order: None,
      shipment: None,
      confirmation_email_sent: false,
    }
  }
}

// --- Storefront auth ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub created_account_id: Option<Uuid>,
  pub welcome_email_sent: bool,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub stored_password_hash: Option<String>,
  pub account_id: Option<Uuid>,
  pub session_token: Option<String>,
}

// --- Broadcast email ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum BroadcastTarget {
  All,
  Group { group_id: Uuid },
  Customers { customer_ids: Vec<Uuid> },
}

#[derive(Clone)]
pub struct BroadcastCtxData {
  pub app_state: AppState,
  pub subject: String,
  pub body_html: String,
  pub target: BroadcastTarget,
  // Populated by the flow:
  pub recipients: Vec<String>,
  pub sent: usize,
  pub failed: usize,
}

impl BroadcastCtxData {
  pub fn new(app_state: AppState, subject: String, body_html: String, target: BroadcastTarget) -> Self {
    Self {
      app_state,
      subject,
      body_html,
      target,
      recipients: Vec::new(),
      sent: 0,
      failed: 0,
    }
  }
}
