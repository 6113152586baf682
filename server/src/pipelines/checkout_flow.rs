//! Storefront checkout: validate the cart, recompute the total server-side,
//! apply a coupon, upsert the customer by phone, then create the order and
//! its shipment together in one transaction.

use crate::errors::AppError;
use crate::models::customer::CUSTOMER_COLUMNS;
use crate::models::order::{compute_total_paise, ORDER_COLUMNS};
use crate::models::shipment::SHIPMENT_COLUMNS;
use crate::models::{Customer, Order, Shipment};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::mailer::OutboundEmail;
use crate::services::{coupons, emails};
use crate::state::AppState;
use darzi_flow::{ContextData, Flow, FlowRegistry, StepControl};
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_checkout_flow(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut flow = Flow::<CheckoutCtxData, AppError>::new(&[
    ("validate_cart", false, None),
    (
      "validate_coupon",
      false,
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| {
        ctx.read().payload.coupon_code.is_none()
      })),
    ),
    ("recompute_total", false, None),
    ("upsert_customer", false, None),
    ("create_order_and_shipment", false, None),
    (
      "record_coupon_usage",
      false,
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| ctx.read().coupon.is_none())),
    ),
    ("send_confirmation_email", true, None),
  ]);

  // Step 1: Validate the cart and the shipping details.
  flow.on_step("validate_cart", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let payload = ctx.read().payload.clone();

      if payload.items.is_empty() {
        return Err(AppError::Validation("Cart is empty.".to_string()));
      }
      for item in &payload.items {
        if item.title.trim().is_empty() {
          return Err(AppError::Validation("Every line item needs a title.".to_string()));
        }
        if item.quantity <= 0 {
          return Err(AppError::Validation(format!(
            "Invalid quantity {} for '{}'.",
            item.quantity, item.title
          )));
        }
        if item.unit_price_paise < 0 {
          return Err(AppError::Validation(format!("Invalid price for '{}'.", item.title)));
        }
      }
      if payload.customer.name.trim().is_empty() {
        return Err(AppError::Validation("Customer name is required.".to_string()));
      }
      if payload.customer.phone.trim().is_empty() {
        return Err(AppError::Validation("Customer phone is required.".to_string()));
      }
      if payload.customer.address.trim().is_empty() {
        return Err(AppError::Validation("Shipping address is required.".to_string()));
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 2 (only with a coupon code): look it up and apply the usage rules.
  flow.on_step("validate_coupon", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (code, phone, db_pool) = {
        let guard = ctx.read();
        let Some(code) = guard.payload.coupon_code.clone() else {
          return Ok::<_, AppError>(StepControl::Continue);
        };
        (code, guard.payload.customer.phone.clone(), guard.app_state.db_pool.clone())
      };

      let coupon = coupons::validate_for(&db_pool, &code, &phone).await?;
      info!(code = %coupon.code, discount = coupon.discount_percent, "coupon accepted");
      ctx.write().coupon = Some(coupon);
      Ok(StepControl::Continue)
    })
  });

  // Step 3: The server is the only authority on the total.
  flow.on_step("recompute_total", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let gross = compute_total_paise(&guard.payload.items);
      let net = match &guard.coupon {
        Some(c) => coupons::apply_discount(gross, c.discount_percent),
        None => gross,
      };
      guard.total_paise = net;
      info!(gross_paise = gross, net_paise = net, "order total recomputed");
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 4: Find or create the customer, keyed by phone.
  flow.on_step("upsert_customer", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (details, db_pool) = {
        let guard = ctx.read();
        (guard.payload.customer.clone(), guard.app_state.db_pool.clone())
      };

      let existing: Option<Customer> =
        sqlx::query_as(&format!("SELECT {} FROM customers WHERE phone = $1", CUSTOMER_COLUMNS))
          .bind(&details.phone)
          .fetch_optional(&db_pool)
          .await?;

      let customer = match existing {
        Some(found) => {
          // Remember any email address we have not seen for this customer.
          if !details.email.is_empty() && !found.emails.contains(&details.email) {
            sqlx::query_as(&format!(
              "UPDATE customers SET emails = array_append(emails, $1), updated_at = now() WHERE id = $2 RETURNING {}",
              CUSTOMER_COLUMNS
            ))
            .bind(&details.email)
            .bind(found.id)
            .fetch_one(&db_pool)
            .await?
          } else {
            found
          }
        }
        None => {
          let seq: i64 = sqlx::query_scalar("SELECT nextval('customer_code_seq')")
            .fetch_one(&db_pool)
            .await?;
          let code = format!("CUST-{}", seq);
          sqlx::query_as(&format!(
            "INSERT INTO customers (code, name, phone, emails, address, city, state, pincode) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            CUSTOMER_COLUMNS
          ))
          .bind(&code)
          .bind(&details.name)
          .bind(&details.phone)
          .bind(if details.email.is_empty() { vec![] } else { vec![details.email.clone()] })
          .bind(&details.address)
          .bind(&details.city)
          .bind(&details.state)
          .bind(&details.pincode)
          .fetch_one(&db_pool)
          .await?
        }
      };

      info!(customer_code = %customer.code, "customer resolved for checkout");
      ctx.write().customer = Some(customer);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 5: Order and shipment are born together.
  flow.on_step("create_order_and_shipment", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (payload, customer, total_paise, db_pool) = {
        let guard = ctx.read();
        (
          guard.payload.clone(),
          guard
            .customer
            .clone()
            .ok_or_else(|| AppError::Internal("customer not resolved before order creation".to_string()))?,
          guard.total_paise,
          guard.app_state.db_pool.clone(),
        )
      };

      let mut tx = db_pool.begin().await?;
      let order: Order = sqlx::query_as(&format!(
        "INSERT INTO orders (customer_id, customer_ref, items, ship_name, ship_phone, ship_address, \
         ship_city, ship_state, ship_pincode, total_paise, payment_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
        ORDER_COLUMNS
      ))
      .bind(customer.id)
      .bind(&customer.code)
      .bind(Json(&payload.items))
      .bind(&payload.customer.name)
      .bind(&payload.customer.phone)
      .bind(&payload.customer.address)
      .bind(&payload.customer.city)
      .bind(&payload.customer.state)
      .bind(&payload.customer.pincode)
      .bind(total_paise)
      .bind(payload.payment_status)
      .fetch_one(&mut *tx)
      .await?;

      let shipment: Shipment = sqlx::query_as(&format!(
        "INSERT INTO shipments (order_id, customer_id) VALUES ($1, $2) RETURNING {}",
        SHIPMENT_COLUMNS
      ))
      .bind(order.id)
      .bind(customer.id)
      .fetch_one(&mut *tx)
      .await?;
      tx.commit().await?;

      info!(order_id = %order.id, shipment_id = %shipment.id, total_paise, "order and shipment created");
      {
        let mut guard = ctx.write();
        guard.order = Some(order);
        guard.shipment = Some(shipment);
      }
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  // Step 6 (only with a coupon): record the redemption.
  flow.on_step("record_coupon_usage", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (coupon, phone, order_id, db_pool) = {
        let guard = ctx.read();
        let Some(coupon) = guard.coupon.clone() else {
          return Ok::<_, AppError>(StepControl::Continue);
        };
        let Some(order) = guard.order.as_ref() else {
          return Ok(StepControl::Continue);
        };
        (
          coupon,
          guard.payload.customer.phone.clone(),
          order.id,
          guard.app_state.db_pool.clone(),
        )
      };

      let usage = coupons::record_usage(&db_pool, coupon.id, &phone, order_id).await?;
      info!(code = %coupon.code, order_id = %order_id, usage_id = %usage.id, "coupon redemption recorded");
      Ok(StepControl::Continue)
    })
  });

  // Step 7: Confirmation email, best effort.
  flow.on_step("send_confirmation_email", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (order, name, email, app_state) = {
        let guard = ctx.read();
        let Some(order) = guard.order.clone() else {
          return Ok::<_, AppError>(StepControl::Continue);
        };
        (
          order,
          guard.payload.customer.name.clone(),
          guard.payload.customer.email.clone(),
          guard.app_state.clone(),
        )
      };

      if email.is_empty() {
        info!(order_id = %order.id, "no email on checkout payload, skipping confirmation");
        return Ok(StepControl::Continue);
      }

      let rendered = emails::order_confirmation_email(&order, &name);
      match app_state
        .mailer
        .send(OutboundEmail {
          to: email,
          subject: rendered.subject,
          html_body: rendered.html,
          attachment: None,
        })
        .await
      {
        Ok(()) => ctx.write().confirmation_email_sent = true,
        Err(e) => {
          warn!(order_id = %order.id, error = %e, "confirmation email failed");
          ctx.write().confirmation_email_sent = false;
        }
      }
      Ok(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Checkout flow registered.");
}
