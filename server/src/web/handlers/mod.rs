pub mod admin_analytics_handlers;
pub mod admin_auth_handlers;
pub mod admin_broadcast_handlers;
pub mod admin_customer_handlers;
pub mod admin_group_handlers;
pub mod admin_order_handlers;
pub mod admin_product_handlers;
pub mod admin_shipment_handlers;
pub mod auth_handlers;
pub mod checkout_handlers;
pub mod coupon_handlers;
pub mod feedback_handlers;
pub mod newsletter_handlers;
pub mod product_handlers;
