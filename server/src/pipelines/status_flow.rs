//! The order/shipment status transition flow.
//!
//! load both records → apply + persist the transition in one transaction →
//! generate the invoice PDF (shipped only) → send the stage email. The two
//! side-effect steps are optional: their failures are logged and never roll
//! back the status mutation.

use crate::errors::AppError;
use crate::lifecycle;
use crate::models::customer::CUSTOMER_COLUMNS;
use crate::models::order::ORDER_COLUMNS;
use crate::models::shipment::SHIPMENT_COLUMNS;
use crate::models::{Customer, FulfillmentStatus, Order, Shipment};
use crate::pipelines::contexts::StatusCtxData;
use crate::services::mailer::{EmailAttachment, OutboundEmail};
use crate::services::{emails, invoice, tokens};
use crate::state::AppState;
use chrono::Utc;
use darzi_flow::{ContextData, Flow, FlowRegistry, StepControl};
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn register_status_flow(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut flow = Flow::<StatusCtxData, AppError>::new(&[
    ("load_order_and_shipment", false, None),
    ("apply_status_change", false, None),
    (
      "generate_invoice",
      true,
      Some(Arc::new(|ctx: ContextData<StatusCtxData>| {
        ctx.read().target != FulfillmentStatus::Shipped
      })),
    ),
    (
      "send_status_email",
      true,
      Some(Arc::new(|ctx: ContextData<StatusCtxData>| {
        ctx.read().target == FulfillmentStatus::Pending
      })),
    ),
  ]);

  // Step 1: Load the order, its shipment, and (best effort) the customer.
  flow.on_step("load_order_and_shipment", |ctx: ContextData<StatusCtxData>| {
    Box::pin(async move {
      let (order_id, db_pool) = {
        let guard = ctx.read();
        (guard.order_id, guard.app_state.db_pool.clone())
      };

      let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
        .bind(order_id)
        .fetch_optional(&db_pool)
        .await?;
      let order = order.ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;

      let shipment: Option<Shipment> =
        sqlx::query_as(&format!("SELECT {} FROM shipments WHERE order_id = $1", SHIPMENT_COLUMNS))
          .bind(order_id)
          .fetch_optional(&db_pool)
          .await?;
      let shipment = shipment.ok_or_else(|| AppError::NotFound(format!("Shipment for order {} not found.", order_id)))?;

      let customer: Option<Customer> =
        sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS))
          .bind(order.customer_id)
          .fetch_optional(&db_pool)
          .await?;
      if customer.is_none() {
        warn!(order_id = %order_id, "customer record missing, notifications will be skipped");
      }

      {
        let mut guard = ctx.write();
        guard.order = Some(order);
        guard.shipment = Some(shipment);
        guard.customer = customer;
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 2: Apply the transition and persist both records atomically.
  flow.on_step("apply_status_change", |ctx: ContextData<StatusCtxData>| {
    Box::pin(async move {
      let (mut order, mut shipment, target, meta, db_pool) = {
        let guard = ctx.read();
        (
          guard.order.clone().ok_or_else(|| AppError::Internal("order not loaded".to_string()))?,
          guard
            .shipment
            .clone()
            .ok_or_else(|| AppError::Internal("shipment not loaded".to_string()))?,
          guard.target,
          guard.meta.clone(),
          guard.app_state.db_pool.clone(),
        )
      };

      let outcome = lifecycle::apply_transition(&mut order, &mut shipment, target, &meta, Utc::now());
      info!(
        order_id = %order.id,
        target = target.label(),
        stamped_now = outcome.stamped_now,
        invoice_no = ?outcome.invoice_no_assigned,
        "applying status transition"
      );

      let mut tx = db_pool.begin().await?;
      sqlx::query(
        "UPDATE orders SET status = $1, fulfilled_at = $2, shipped_at = $3, out_for_delivery_at = $4, \
         delivered_at = $5, invoice_no = $6, updated_at = $7 WHERE id = $8",
      )
      .bind(order.status)
      .bind(order.fulfilled_at)
      .bind(order.shipped_at)
      .bind(order.out_for_delivery_at)
      .bind(order.delivered_at)
      .bind(&order.invoice_no)
      .bind(order.updated_at)
      .bind(order.id)
      .execute(&mut *tx)
      .await?;

      sqlx::query(
        "UPDATE shipments SET status = $1, fulfilled_at = $2, shipped_at = $3, out_for_delivery_at = $4, \
         delivered_at = $5, tracking_id = $6, carrier = $7, packaging_provider = $8, updated_at = $9 WHERE id = $10",
      )
      .bind(shipment.status)
      .bind(shipment.fulfilled_at)
      .bind(shipment.shipped_at)
      .bind(shipment.out_for_delivery_at)
      .bind(shipment.delivered_at)
      .bind(&shipment.tracking_id)
      .bind(&shipment.carrier)
      .bind(&shipment.packaging_provider)
      .bind(shipment.updated_at)
      .bind(shipment.id)
      .execute(&mut *tx)
      .await?;
      tx.commit().await?;

      {
        let mut guard = ctx.write();
        guard.order = Some(order);
        guard.shipment = Some(shipment);
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Both records must leave the step in lockstep.
  flow.after_step("apply_status_change", |ctx: ContextData<StatusCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      if let (Some(order), Some(shipment)) = (&guard.order, &guard.shipment) {
        if order.status != shipment.status {
          error!(order_id = %order.id, "order and shipment status diverged after transition");
          return Err(AppError::Internal("Order and shipment status diverged.".to_string()));
        }
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 3 (shipped only): render, rasterize, and persist the invoice PDF.
  flow.on_step("generate_invoice", |ctx: ContextData<StatusCtxData>| {
    Box::pin(async move {
      let (order, shipment, app_state) = {
        let guard = ctx.read();
        let Some(order) = guard.order.clone() else {
          return Ok::<_, AppError>(StepControl::Continue);
        };
        (order, guard.shipment.clone(), guard.app_state.clone())
      };

      let html = invoice::render_invoice_html(&order, shipment.as_ref());
      let invoice_no = order.invoice_no.clone().unwrap_or_else(|| "DRAFT".to_string());

      match app_state.pdf.render_pdf(&html).await {
        Ok(pdf_bytes) => {
          if let Err(e) = invoice::persist_invoice(&app_state.db_pool, order.id, &invoice_no, &pdf_bytes).await {
            warn!(order_id = %order.id, error = %e, "failed to persist invoice PDF");
          }
          ctx.write().invoice_pdf = Some(pdf_bytes);
        }
        Err(e) => {
          // Best effort: the transition stands, the shipping email just goes
          // out without an attachment.
          warn!(order_id = %order.id, error = %e, "invoice PDF generation failed");
        }
      }
      Ok(StepControl::Continue)
    })
  });

  // Step 4: per-stage notification email.
  flow.on_step("send_status_email", |ctx: ContextData<StatusCtxData>| {
    Box::pin(async move {
      let (order, customer, target, invoice_pdf, app_state) = {
        let guard = ctx.read();
        let Some(order) = guard.order.clone() else {
          return Ok::<_, AppError>(StepControl::Continue);
        };
        (
          order,
          guard.customer.clone(),
          guard.target,
          guard.invoice_pdf.clone(),
          guard.app_state.clone(),
        )
      };

      let Some(customer) = customer else {
        info!(order_id = %order.id, "no customer record, skipping status email");
        return Ok(StepControl::Continue);
      };
      let Some(recipient) = customer.primary_email().map(String::from) else {
        info!(order_id = %order.id, "customer has no email address, skipping status email");
        return Ok(StepControl::Continue);
      };

      let feedback_url = if target == FulfillmentStatus::Delivered {
        match tokens::issue_feedback_token(order.id, customer.id, &app_state.config.jwt_secret, Utc::now()) {
          Ok(token) => Some(format!("{}/feedback/{}", app_state.config.app_base_url, token)),
          Err(e) => {
            warn!(order_id = %order.id, error = %e, "failed to issue feedback token");
            None
          }
        }
      } else {
        None
      };

      let Some(rendered) = emails::status_email(target, &order, &customer.name, feedback_url.as_deref()) else {
        return Ok(StepControl::Continue);
      };

      let attachment = match (target, invoice_pdf, &order.invoice_no) {
        (FulfillmentStatus::Shipped, Some(bytes), Some(no)) => Some(EmailAttachment {
          filename: format!("{}.pdf", no),
          content_type: "application/pdf".to_string(),
          bytes,
        }),
        _ => None,
      };

      let result = app_state
        .mailer
        .send(OutboundEmail {
          to: recipient.clone(),
          subject: rendered.subject,
          html_body: rendered.html,
          attachment,
        })
        .await;

      match result {
        Ok(()) => {
          info!(order_id = %order.id, to = %recipient, stage = target.label(), "status email sent");
          ctx.write().email_sent = true;
        }
        Err(e) => {
          // Logged and swallowed: email never rolls back a transition.
          warn!(order_id = %order.id, error = %e, "status email failed");
          ctx.write().email_sent = false;
        }
      }
      Ok(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Status transition flow registered.");
}
