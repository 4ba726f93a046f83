//! Internal billing events decoded from verified provider payloads.
//!
//! The reconciler dispatches on these types rather than on the provider's
//! wire format, decoupling reconciliation from the provider SDK shapes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Snapshot of a provider subscription: the facts reconciliation needs.
///
/// Built either from a webhook payload or from a live provider re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Provider subscription id (sub_...).
    pub subscription_id: String,

    /// Provider customer id (cus_...).
    pub customer_id: String,

    /// Raw provider status string, retained for diagnostics.
    pub status: String,

    /// Product id of the first subscription item; drives tier resolution.
    pub product_id: Option<String>,

    /// Current billing period start.
    pub period_start: Option<Timestamp>,

    /// Current billing period end.
    pub period_end: Option<Timestamp>,
}

/// A verified billing event ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Provider event id (evt_...).
    pub id: String,

    /// Unix timestamp when the provider created the event.
    pub created: i64,

    /// The decoded event payload.
    pub kind: BillingEventKind,
}

/// The event kinds the reconciler understands, plus a catch-all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BillingEventKind {
    /// A checkout session finished successfully.
    CheckoutCompleted {
        session_id: String,
        /// Application user id from the session's client reference,
        /// falling back to session metadata. Absent when the checkout
        /// was started without one.
        user_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },

    /// The provider-side subscription changed.
    SubscriptionUpdated { subscription: SubscriptionSnapshot },

    /// The provider-side subscription ended.
    SubscriptionDeleted { subscription: SubscriptionSnapshot },

    /// An invoice was paid.
    InvoicePaymentSucceeded {
        invoice_id: String,
        customer_id: String,
        subscription_id: Option<String>,
    },

    /// An invoice payment attempt failed.
    InvoicePaymentFailed {
        invoice_id: String,
        customer_id: String,
        subscription_id: Option<String>,
        attempt_count: i32,
    },

    /// Any event type this service does not handle.
    Other { event_type: String },
}

impl BillingEventKind {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BillingEventKind::CheckoutCompleted { .. } => "checkout_completed",
            BillingEventKind::SubscriptionUpdated { .. } => "subscription_updated",
            BillingEventKind::SubscriptionDeleted { .. } => "subscription_deleted",
            BillingEventKind::InvoicePaymentSucceeded { .. } => "invoice_payment_succeeded",
            BillingEventKind::InvoicePaymentFailed { .. } => "invoice_payment_failed",
            BillingEventKind::Other { .. } => "other",
        }
    }
}
