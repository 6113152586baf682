//! Storefront checkout endpoint; the heavy lifting lives in the checkout flow.

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutPayload};
use crate::state::AppState;
use darzi_flow::{ContextData, FlowOutcome};

#[instrument(name = "handler::checkout", skip(app_state, payload), fields(phone = %payload.customer.phone, items = payload.items.len()))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CheckoutCtxData::new(app_state.get_ref().clone(), payload.into_inner()));

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Checkout completed without creating an order.".to_string()))?;
      let shipment = guard
        .shipment
        .as_ref()
        .ok_or_else(|| AppError::Internal("Checkout completed without creating a shipment.".to_string()))?;

      info!(order_id = %order.id, "checkout completed");
      Ok(HttpResponse::Created().json(json!({
        "message": "Order placed successfully.",
        "orderId": order.id.to_string(),
        "shipmentId": shipment.id.to_string(),
        "customerRef": order.customer_ref,
        "totalPaise": order.total_paise,
        "couponApplied": guard.coupon.as_ref().map(|c| c.code.clone()),
        "confirmationEmailSent": guard.confirmation_email_sent,
      })))
    }
    FlowOutcome::Halted => {
      warn!("checkout flow halted unexpectedly");
      Err(AppError::Internal("Checkout was halted before completion.".to_string()))
    }
  }
}
