//! Data structures mirroring the database tables in `schema.sql`.

pub mod account;
pub mod coupon;
pub mod customer;
pub mod feedback;
pub mod group;
pub mod invoice;
pub mod order;
pub mod product;
pub mod shipment;

pub use account::Account;
pub use coupon::{Coupon, CouponKind, CouponUsage};
pub use customer::Customer;
pub use feedback::Feedback;
pub use group::CustomerGroup;
pub use invoice::StoredInvoice;
pub use order::{FulfillmentStatus, Order, OrderItem, PaymentStatus};
pub use product::Product;
pub use shipment::Shipment;
