//! Payment provider port.
//!
//! Contract for the external payment platform (Stripe). The domain only
//! consumes three capabilities: verifying + decoding webhook deliveries,
//! re-fetching a subscription snapshot, and minting billing portal
//! sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::billing::{BillingEvent, SubscriptionSnapshot, WebhookError};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch the current subscription object from the provider.
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError>;

    /// Create a provider-hosted billing portal session for a customer.
    ///
    /// The returned URL is handed to the caller verbatim.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;

    /// Verify a webhook payload signature and decode the event.
    ///
    /// This must run before any event-type interpretation; it is the sole
    /// authentication on the webhook path.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, WebhookError>;
}

/// Portal session for subscription management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to access the portal.
    pub url: String,
}

/// Errors from payment provider API operations.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// Network connectivity issue; typically retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Provider API returned an error response.
    #[error("provider error: {0}")]
    Provider(String),

    /// The referenced provider resource does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

impl PaymentError {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Network(_))
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        match err {
            // A vanished resource is permanent from the event's point of
            // view; retrying the delivery cannot make it reappear.
            PaymentError::NotFound(resource) => {
                WebhookError::Unprocessable(format!("{} not found at provider", resource))
            }
            other => WebhookError::Provider(other.to_string()),
        }
    }
}
