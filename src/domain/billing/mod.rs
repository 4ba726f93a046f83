//! Billing domain module.
//!
//! Reconciles payment-provider events onto per-user subscription records.
//!
//! # Module Structure
//!
//! - `tier` - SubscriptionTier levels and product-id resolution
//! - `status` - Provider status parsing and the entitlement allow-list
//! - `record` - SubscriptionRecord and merge patch semantics
//! - `event` - Internal billing event types decoded from provider payloads
//! - `errors` - Webhook and caller-operation error taxonomies

mod errors;
mod event;
mod record;
mod status;
mod tier;

pub use errors::{BillingError, WebhookError};
pub use event::{BillingEvent, BillingEventKind, SubscriptionSnapshot};
pub use record::{RecordPatch, SubscriptionRecord};
pub use status::ProviderStatus;
pub use tier::{SubscriptionTier, TierResolver};
