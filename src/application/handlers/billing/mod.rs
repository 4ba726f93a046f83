//! Billing handlers.
//!
//! Command and query handlers for billing-state reconciliation:
//!
//! ## Commands
//! - Processing payment provider webhooks
//! - Creating billing portal sessions
//! - Manually re-syncing subscription state from the provider
//!
//! ## Queries
//! - Get the current subscription record

mod create_portal_session;
mod get_subscription;
mod process_webhook;
mod sync_subscription;

// Commands
pub use create_portal_session::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, CreatePortalSessionResult,
};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookOutcome};
pub use sync_subscription::{
    SyncSubscriptionCommand, SyncSubscriptionHandler, SyncSubscriptionResult,
};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
