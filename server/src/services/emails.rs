//! Transactional email templates: pure functions from order/customer data to
//! subject + HTML. No state, no I/O; the caller hands the result to a Mailer.

use crate::models::{FulfillmentStatus, Order};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
  pub subject: String,
  pub html: String,
}

fn format_paise(paise: i64) -> String {
  format!("\u{20b9}{}.{:02}", paise / 100, (paise % 100).abs())
}

fn shell(heading: &str, inner: &str) -> String {
  format!(
    r#"<div style="font-family:Georgia,serif;max-width:600px;margin:0 auto;color:#1c1c1c">
  <div style="background:#14213d;color:#ffffff;padding:18px 24px">
    <h1 style="margin:0;font-size:22px;letter-spacing:3px">DARZI</h1>
    <p style="margin:2px 0 0;font-size:12px;color:#e5e5e5">Fine menswear, tailored for you</p>
  </div>
  <div style="padding:24px">
    <h2 style="margin-top:0;font-size:18px">{heading}</h2>
    {inner}
    <p style="font-size:12px;color:#6b6b6b;margin-top:32px">Questions? Just reply to this email.</p>
  </div>
</div>"#
  )
}

fn items_table(order: &Order) -> String {
  let mut rows = String::new();
  for item in order.items.0.iter() {
    rows.push_str(&format!(
      "<tr><td style=\"padding:6px 8px\">{}</td><td style=\"padding:6px 8px\">{}</td><td style=\"padding:6px 8px\">{}</td><td style=\"padding:6px 8px;text-align:right\">{}</td></tr>",
      item.title,
      item.size,
      item.quantity,
      format_paise(item.subtotal_paise()),
    ));
  }
  format!(
    r#"<table style="width:100%;border-collapse:collapse;font-size:14px">
  <tr style="background:#f2f2f2"><th style="padding:6px 8px;text-align:left">Item</th><th style="padding:6px 8px;text-align:left">Size</th><th style="padding:6px 8px;text-align:left">Qty</th><th style="padding:6px 8px;text-align:right">Amount</th></tr>
  {rows}
  <tr><td colspan="3" style="padding:6px 8px;text-align:right;font-weight:bold">Total</td><td style="padding:6px 8px;text-align:right;font-weight:bold">{total}</td></tr>
</table>"#,
    total = format_paise(order.total_paise),
  )
}

pub fn welcome_email(recipient_name: &str) -> RenderedEmail {
  RenderedEmail {
    subject: format!("Welcome to DARZI, {}!", recipient_name),
    html: shell(
      &format!("Hi {},", recipient_name),
      "<p>Thanks for signing up. Your wardrobe is in good hands.</p>",
    ),
  }
}

pub fn order_confirmation_email(order: &Order, recipient_name: &str) -> RenderedEmail {
  let inner = format!(
    "<p>Hi {}, your order has been placed successfully.</p>{}<p>We will let you know as soon as it ships.</p>",
    recipient_name,
    items_table(order)
  );
  RenderedEmail {
    subject: format!("Your DARZI order {} is confirmed", order.short_ref()),
    html: shell("Order confirmed", &inner),
  }
}

pub fn order_fulfilled_email(order: &Order, recipient_name: &str) -> RenderedEmail {
  let inner = format!(
    "<p>Hi {}, your order has been packed and is ready to leave our atelier.</p>{}",
    recipient_name,
    items_table(order)
  );
  RenderedEmail {
    subject: "Your DARZI order has been packed".to_string(),
    html: shell("Packed and ready", &inner),
  }
}

pub fn order_shipped_email(order: &Order, recipient_name: &str) -> RenderedEmail {
  let invoice_line = match &order.invoice_no {
    Some(no) => format!("<p>Your invoice <strong>{}</strong> is attached to this email.</p>", no),
    None => String::new(),
  };
  let inner = format!(
    "<p>Hi {}, your order is on its way.</p>{}{}",
    recipient_name,
    items_table(order),
    invoice_line
  );
  RenderedEmail {
    subject: "Your DARZI order has shipped".to_string(),
    html: shell("On its way", &inner),
  }
}

pub fn out_for_delivery_email(order: &Order, recipient_name: &str) -> RenderedEmail {
  let inner = format!(
    "<p>Hi {}, your order is out for delivery and should reach you today.</p><p>Delivery address: {}, {} {}</p>",
    recipient_name, order.ship_address, order.ship_city, order.ship_pincode
  );
  RenderedEmail {
    subject: "Your DARZI order is out for delivery".to_string(),
    html: shell("Out for delivery", &inner),
  }
}

pub fn order_delivered_email(order: &Order, recipient_name: &str, feedback_url: &str) -> RenderedEmail {
  let inner = format!(
    r#"<p>Hi {}, your order has been delivered. We hope everything fits perfectly.</p>
{}
<p style="margin-top:24px"><a href="{}" style="background:#14213d;color:#ffffff;padding:10px 18px;text-decoration:none">Tell us how we did</a></p>
<p style="font-size:12px;color:#6b6b6b">The feedback link stays valid for 90 days.</p>"#,
    recipient_name,
    items_table(order),
    feedback_url
  );
  RenderedEmail {
    subject: "Your DARZI order has been delivered".to_string(),
    html: shell("Delivered", &inner),
  }
}

pub fn password_reset_email(code: &str) -> RenderedEmail {
  let inner = format!(
    "<p>Use this code to reset your password. It expires in 15 minutes.</p><p style=\"font-size:28px;letter-spacing:6px;font-weight:bold\">{}</p><p>If you did not request a reset, ignore this email.</p>",
    code
  );
  RenderedEmail {
    subject: "Your DARZI password reset code".to_string(),
    html: shell("Password reset", &inner),
  }
}

/// Wraps admin-authored broadcast HTML in the brand shell.
pub fn broadcast_email(subject: &str, body_html: &str) -> RenderedEmail {
  RenderedEmail {
    subject: subject.to_string(),
    html: shell(subject, body_html),
  }
}

/// Picks the template for a status-transition notification. `Pending` has no
/// notification and returns `None`.
pub fn status_email(
  target: FulfillmentStatus,
  order: &Order,
  recipient_name: &str,
  feedback_url: Option<&str>,
) -> Option<RenderedEmail> {
  match target {
    FulfillmentStatus::Pending => None,
    FulfillmentStatus::Fulfilled => Some(order_fulfilled_email(order, recipient_name)),
    FulfillmentStatus::Shipped => Some(order_shipped_email(order, recipient_name)),
    FulfillmentStatus::OutForDelivery => Some(out_for_delivery_email(order, recipient_name)),
    FulfillmentStatus::Delivered => Some(order_delivered_email(order, recipient_name, feedback_url.unwrap_or("#"))),
  }
}

impl Order {
  /// Short order reference shown to customers in email subjects: the invoice
  /// number once one exists, a truncated id before that.
  pub fn short_ref(&self) -> String {
    self.invoice_no.clone().unwrap_or_else(|| {
      let id = self.id.simple().to_string();
      format!("#{}", &id[..8])
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{OrderItem, PaymentStatus};
  use chrono::Utc;
  use sqlx::types::Json;
  use uuid::Uuid;

  fn sample_order() -> Order {
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      customer_ref: "CUST-3".to_string(),
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
      status: FulfillmentStatus::Pending,
      fulfilled_at: None,
      shipped_at: None,
      out_for_delivery_at: None,
      delivered_at: None,
      invoice_no: Some("INV-202501-0042".to_string()),
      archived: false,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn shipped_email_mentions_the_attached_invoice() {
    let email = order_shipped_email(&sample_order(), "Ravi");
    assert!(email.html.contains("INV-202501-0042"));
    assert!(email.html.contains("Oxford Shirt"));
    assert!(email.subject.contains("shipped"));
  }

  #[test]
  fn delivered_email_carries_the_feedback_link() {
    let email = order_delivered_email(&sample_order(), "Ravi", "https://darzi.example/feedback/tok123");
    assert!(email.html.contains("https://darzi.example/feedback/tok123"));
    assert!(email.html.contains("90 days"));
  }

  #[test]
  fn items_table_shows_quantities_and_total() {
    let email = order_confirmation_email(&sample_order(), "Ravi");
    assert!(email.html.contains("Oxford Shirt"));
    assert!(email.html.contains("Pocket Square"));
    // 2 x Rs.100 = Rs.200 line subtotal and Rs.250 grand total.
    assert!(email.html.contains("\u{20b9}200.00"));
    assert!(email.html.contains("\u{20b9}250.00"));
  }

  #[test]
  fn status_email_covers_every_notifiable_stage() {
    let order = sample_order();
    assert!(status_email(FulfillmentStatus::Pending, &order, "R", None).is_none());
    for stage in [
      FulfillmentStatus::Fulfilled,
      FulfillmentStatus::Shipped,
      FulfillmentStatus::OutForDelivery,
      FulfillmentStatus::Delivered,
    ] {
      assert!(status_email(stage, &order, "R", Some("#")).is_some());
    }
  }

  #[test]
  fn reset_email_contains_the_code() {
    let email = password_reset_email("482913");
    assert!(email.html.contains("482913"));
    assert!(email.html.contains("15 minutes"));
  }
}
