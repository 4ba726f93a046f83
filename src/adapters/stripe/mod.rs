//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, including:
//! - Webhook signature verification (HMAC-SHA256, constant-time compare,
//!   5-minute replay window)
//! - Decoding webhook payloads into internal billing events
//! - Subscription re-fetch and billing portal sessions over REST

mod gateway;
mod types;

pub use gateway::{StripeConfig, StripeGateway};
pub use types::{
    SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeInvoice,
    StripeSubscription, StripeWebhookEvent,
};
