use actix_web::web;

use crate::web::handlers::{
  admin_analytics_handlers, admin_auth_handlers, admin_broadcast_handlers, admin_customer_handlers,
  admin_group_handlers, admin_order_handlers, admin_product_handlers, admin_shipment_handlers, auth_handlers,
  checkout_handlers, coupon_handlers, feedback_handlers, newsletter_handlers, product_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Public storefront surface.
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/me", web::get().to(auth_handlers::me_handler))
          .route("/reset/request", web::post().to(auth_handlers::reset_request_handler))
          .route("/reset/confirm", web::post().to(auth_handlers::reset_confirm_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      .route("/coupons/validate", web::post().to(coupon_handlers::validate_coupon_handler))
      .route("/newsletter", web::post().to(newsletter_handlers::subscribe_handler))
      .service(
        web::scope("/feedback")
          .route("/{token}", web::get().to(feedback_handlers::get_feedback_context_handler))
          .route("/{token}", web::post().to(feedback_handlers::submit_feedback_handler)),
      ),
  );

  // Admin back-office; every handler (except login) takes the AdminSession
  // extractor, the cookie gate for this scope.
  cfg.service(
    web::scope("/admin")
      .route("/login", web::post().to(admin_auth_handlers::admin_login_handler))
      .route("/logout", web::post().to(admin_auth_handlers::admin_logout_handler))
      .service(
        web::scope("/customers")
          .route("", web::get().to(admin_customer_handlers::list_customers_handler))
          .route("", web::post().to(admin_customer_handlers::create_customer_handler))
          .route("/bulk", web::post().to(admin_customer_handlers::bulk_customers_handler))
          .route("/import", web::post().to(admin_customer_handlers::import_customers_handler))
          .route("/export", web::get().to(admin_customer_handlers::export_customers_handler))
          .route("/{customer_id}", web::get().to(admin_customer_handlers::get_customer_handler))
          .route("/{customer_id}", web::put().to(admin_customer_handlers::update_customer_handler))
          .route("/{customer_id}", web::delete().to(admin_customer_handlers::delete_customer_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(admin_order_handlers::list_orders_handler))
          .route("", web::post().to(admin_order_handlers::create_order_handler))
          .route("/bulk", web::post().to(admin_order_handlers::bulk_orders_handler))
          .route("/import", web::post().to(admin_order_handlers::import_orders_handler))
          .route("/export", web::get().to(admin_order_handlers::export_orders_handler))
          .route("/{order_id}", web::get().to(admin_order_handlers::get_order_handler))
          .route("/{order_id}", web::put().to(admin_order_handlers::update_order_handler))
          .route("/{order_id}", web::delete().to(admin_order_handlers::delete_order_handler))
          .route("/{order_id}/status", web::put().to(admin_order_handlers::update_order_status_handler))
          .route("/{order_id}/invoice", web::get().to(admin_order_handlers::download_invoice_handler)),
      )
      .service(
        web::scope("/shipments")
          .route("", web::get().to(admin_shipment_handlers::list_shipments_handler))
          .route("/{shipment_id}", web::get().to(admin_shipment_handlers::get_shipment_handler))
          .route("/{shipment_id}", web::put().to(admin_shipment_handlers::update_shipment_handler))
          .route(
            "/{shipment_id}/status",
            web::put().to(admin_shipment_handlers::update_shipment_status_handler),
          ),
      )
      .service(
        web::scope("/groups")
          .route("", web::get().to(admin_group_handlers::list_groups_handler))
          .route("", web::post().to(admin_group_handlers::create_group_handler))
          .route("/{group_id}", web::put().to(admin_group_handlers::update_group_handler))
          .route("/{group_id}", web::delete().to(admin_group_handlers::delete_group_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::post().to(admin_product_handlers::create_product_handler))
          .route("/{product_id}", web::put().to(admin_product_handlers::update_product_handler))
          .route("/{product_id}", web::delete().to(admin_product_handlers::delete_product_handler)),
      )
      .route("/broadcast", web::post().to(admin_broadcast_handlers::broadcast_handler))
      .route("/analytics", web::get().to(admin_analytics_handlers::analytics_handler)),
  );
}
