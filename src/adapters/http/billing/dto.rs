//! Request/response DTOs for billing endpoints.

use serde::Serialize;

use crate::application::handlers::billing::SyncSubscriptionResult;
use crate::domain::billing::{SubscriptionRecord, SubscriptionTier};
use crate::domain::foundation::Timestamp;

/// Fixed acknowledgment payload returned to the webhook caller.
#[derive(Debug, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

impl WebhookAckResponse {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Billing portal session response.
#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub portal_url: String,
}

/// Manual sync response.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub tier: SubscriptionTier,
    pub is_active: bool,
    pub status: String,
}

impl From<SyncSubscriptionResult> for SyncResponse {
    fn from(result: SyncSubscriptionResult) -> Self {
        Self {
            success: result.success,
            tier: result.tier,
            is_active: result.is_active,
            status: result.status,
        }
    }
}

/// Current subscription record projection.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub tier: SubscriptionTier,
    pub is_active: bool,
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,
    pub status: String,
}

impl From<SubscriptionRecord> for SubscriptionResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            tier: record.tier,
            is_active: record.is_active,
            period_start: record.period_start,
            period_end: record.period_end,
            status: record.provider_status,
        }
    }
}

/// Error payload for API failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn ack_response_serializes_fixed_payload() {
        let json = serde_json::to_value(WebhookAckResponse::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"received": true}));
    }

    #[test]
    fn subscription_response_reflects_record() {
        let record = SubscriptionRecord::default_for(UserId::new("user-1").unwrap());
        let response = SubscriptionResponse::from(record);

        assert_eq!(response.tier, SubscriptionTier::Free);
        assert!(!response.is_active);
        assert!(response.period_end.is_none());
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "missing");
    }
}
