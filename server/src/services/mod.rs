pub mod auth;
pub mod coupons;
pub mod csv_io;
pub mod emails;
pub mod invoice;
pub mod mailer;
pub mod pdf;
pub mod tokens;
