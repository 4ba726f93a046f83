//! Billing error types.
//!
//! `WebhookError` carries the retryability semantics that drive the HTTP
//! status returned to the provider: permanent per-event conditions are
//! acknowledged so the provider stops redelivering, while transient faults
//! surface as server errors so the provider retries later.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, UserId};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Permanent per-event condition (unknown user, missing reference).
    /// The event is dropped and acknowledged as success so the provider
    /// does not retry something fundamentally unresolvable.
    #[error("Event unprocessable: {0}")]
    Unprocessable(String),

    /// Subscription store unavailable or failing.
    #[error("Store error: {0}")]
    Store(String),

    /// Payment provider API unreachable or failing.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Store(_) | WebhookError::Provider(_))
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// - 200: event acknowledged (including permanent skips), no retry
    /// - 400: request itself is bad (signature, parse), no retry
    /// - 500: transient fault, provider will redeliver
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            WebhookError::Unprocessable(_) => StatusCode::OK,

            WebhookError::Store(_) | WebhookError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Store(err.to_string())
    }
}

/// Errors surfaced by the caller-invoked billing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// No subscription record exists for this user.
    #[error("No subscription record for user: {0}")]
    NotFound(UserId),

    /// The record exists but has no provider customer attached.
    #[error("No billing customer on record for user: {0}")]
    NoCustomer(UserId),

    /// Payment provider call failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Store or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        BillingError::Infrastructure(err.to_string())
    }
}
