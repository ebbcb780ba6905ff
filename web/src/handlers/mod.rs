//! HTTP request handlers, one module per area of the API.
//!
//! Every handler except the health checks and the menu needs an
//! [`AuthenticatedCaller`](crate::extractors::AuthenticatedCaller).

pub mod cart;
pub mod favorites;
pub mod health;
pub mod menu;
pub mod orders;
pub mod staff;

pub use health::{health_check, readiness_check};
