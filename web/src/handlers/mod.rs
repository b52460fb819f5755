//! HTTP request handlers, one module per route group.

pub mod admin;
pub mod availability;
pub mod bookings;
pub mod drafts;
pub mod health;
pub mod uploads;

pub use health::health_check;
