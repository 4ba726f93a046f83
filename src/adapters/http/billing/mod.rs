//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `GET /api/billing` - Get current user's subscription record
//! - `GET /api/billing/portal` - Get a provider billing portal URL
//! - `POST /api/billing/sync` - Force a re-pull of provider state
//! - `POST /api/webhooks/stripe` - Handle provider webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingAppState};
pub use routes::{billing_router, billing_routes, webhook_routes};
