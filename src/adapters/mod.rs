//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST surface
//! - `postgres` - Subscription record persistence
//! - `stripe` - Payment provider integration

pub mod http;
pub mod postgres;
pub mod stripe;
