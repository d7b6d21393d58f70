pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod coupons;
pub mod payments;
pub mod reviews;
