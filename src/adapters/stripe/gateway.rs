//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API and
//! verifies webhook deliveries.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::billing::{BillingEvent, BillingEventKind, SubscriptionSnapshot, WebhookError};
use crate::ports::{PaymentError, PaymentProvider, PortalSession};

use super::types::{
    SignatureHeader, StripeCheckoutSession, StripeInvoice, StripePortalSession,
    StripeSubscription, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    /// Create a new gateway with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify the webhook signature using HMAC-SHA256.
    ///
    /// Constant-time comparison prevents timing attacks; the timestamp
    /// window prevents replays of captured deliveries.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), WebhookError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(WebhookError::TimestampOutOfRange);
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(WebhookError::InvalidTimestamp);
        }

        let signed_payload = format!(
            "{}.{}",
            header.timestamp,
            String::from_utf8_lossy(payload)
        );

        let mut mac = HmacSha256::new_from_slice(
            self.config.webhook_secret.expose_secret().as_bytes(),
        )
        .expect("HMAC can take key of any size");
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!("Invalid webhook signature");
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Decode a verified payload into the internal event type.
    fn decode_event(&self, payload: &[u8]) -> Result<BillingEvent, WebhookError> {
        let event: StripeWebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(format!("invalid event JSON: {}", e)))?;

        let kind = match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession =
                    serde_json::from_value(event.data.object.clone()).map_err(|e| {
                        WebhookError::ParseError(format!("invalid checkout session: {}", e))
                    })?;
                BillingEventKind::CheckoutCompleted {
                    user_id: session.user_reference(),
                    session_id: session.id,
                    customer_id: session.customer,
                    subscription_id: session.subscription,
                }
            }

            "customer.subscription.updated" => BillingEventKind::SubscriptionUpdated {
                subscription: self.decode_subscription(&event)?,
            },

            "customer.subscription.deleted" => BillingEventKind::SubscriptionDeleted {
                subscription: self.decode_subscription(&event)?,
            },

            "invoice.payment_succeeded" | "invoice.paid" => {
                let invoice = self.decode_invoice(&event)?;
                BillingEventKind::InvoicePaymentSucceeded {
                    invoice_id: invoice.id,
                    customer_id: invoice.customer,
                    subscription_id: invoice.subscription,
                }
            }

            "invoice.payment_failed" => {
                let invoice = self.decode_invoice(&event)?;
                BillingEventKind::InvoicePaymentFailed {
                    invoice_id: invoice.id,
                    customer_id: invoice.customer,
                    subscription_id: invoice.subscription,
                    attempt_count: invoice.attempt_count,
                }
            }

            other => BillingEventKind::Other {
                event_type: other.to_string(),
            },
        };

        Ok(BillingEvent {
            id: event.id,
            created: event.created,
            kind,
        })
    }

    fn decode_subscription(
        &self,
        event: &StripeWebhookEvent,
    ) -> Result<SubscriptionSnapshot, WebhookError> {
        let subscription: StripeSubscription =
            serde_json::from_value(event.data.object.clone())
                .map_err(|e| WebhookError::ParseError(format!("invalid subscription: {}", e)))?;
        Ok(subscription.snapshot())
    }

    fn decode_invoice(&self, event: &StripeWebhookEvent) -> Result<StripeInvoice, WebhookError> {
        serde_json::from_value(event.data.object.clone())
            .map_err(|e| WebhookError::ParseError(format!("invalid invoice: {}", e)))
    }
}

#[async_trait]
impl PaymentProvider for StripeGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::NotFound(format!(
                "subscription {}",
                subscription_id
            )));
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "Stripe subscription fetch failed");
            return Err(PaymentError::Provider(error_text));
        }

        let subscription: StripeSubscription = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("invalid subscription response: {}", e)))?;

        Ok(subscription.snapshot())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let url = format!("{}/v1/billing_portal/sessions", self.config.api_base_url);

        let params = [("customer", customer_id), ("return_url", return_url)];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "Stripe portal session creation failed");
            return Err(PaymentError::Provider(error_text));
        }

        let session: StripePortalSession = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("invalid portal response: {}", e)))?;

        Ok(PortalSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, WebhookError> {
        let header = SignatureHeader::parse(signature)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        self.verify_signature(payload, &header)?;
        self.decode_event(payload)
    }
}

/// Computes a valid signature header value for test fixtures.
#[cfg(test)]
pub fn sign_test_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    use super::types::hex_encode;

    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex_encode(&mac.finalize().into_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SECRET: &str = "whsec_test_secret_12345";

    fn gateway() -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_key", TEST_SECRET))
    }

    fn event_payload(event_type: &str, object: serde_json::Value) -> String {
        json!({
            "id": "evt_test_1",
            "type": event_type,
            "created": 1704067200,
            "data": { "object": object },
            "livemode": false,
            "api_version": "2025-01-27"
        })
        .to_string()
    }

    async fn verify(payload: &str) -> Result<BillingEvent, WebhookError> {
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, timestamp, payload);
        gateway().verify_webhook(payload.as_bytes(), &header).await
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_signature_verifies() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));

        let event = verify(&payload).await.unwrap();

        assert_eq!(event.id, "evt_test_1");
    }

    #[tokio::test]
    async fn wrong_secret_fails_verification() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_test_payload("whsec_other_secret", timestamp, &payload);

        let result = gateway().verify_webhook(payload.as_bytes(), &header).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn tampered_payload_fails_verification() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, timestamp, &payload);
        let tampered = payload.replace("cs_1", "cs_2");

        let result = gateway().verify_webhook(tampered.as_bytes(), &header).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn stale_timestamp_fails_verification() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));
        let timestamp = chrono::Utc::now().timestamp() - 600;
        let header = sign_test_payload(TEST_SECRET, timestamp, &payload);

        let result = gateway().verify_webhook(payload.as_bytes(), &header).await;

        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[tokio::test]
    async fn future_timestamp_fails_verification() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));
        let timestamp = chrono::Utc::now().timestamp() + 120;
        let header = sign_test_payload(TEST_SECRET, timestamp, &payload);

        let result = gateway().verify_webhook(payload.as_bytes(), &header).await;

        assert!(matches!(result, Err(WebhookError::InvalidTimestamp)));
    }

    #[tokio::test]
    async fn garbage_header_fails_with_parse_error() {
        let payload = event_payload("checkout.session.completed", json!({"id": "cs_1"}));

        let result = gateway()
            .verify_webhook(payload.as_bytes(), "not-a-signature-header")
            .await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[tokio::test]
    async fn invalid_json_fails_after_valid_signature() {
        let payload = "not valid json";
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, timestamp, payload);

        let result = gateway().verify_webhook(payload.as_bytes(), &header).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Event Decoding Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn decodes_checkout_completed_with_client_reference() {
        let payload = event_payload(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "client_reference_id": "user-42",
                "customer": "cus_1",
                "subscription": "sub_1"
            }),
        );

        let event = verify(&payload).await.unwrap();

        match event.kind {
            BillingEventKind::CheckoutCompleted {
                session_id,
                user_id,
                customer_id,
                subscription_id,
            } => {
                assert_eq!(session_id, "cs_1");
                assert_eq!(user_id.as_deref(), Some("user-42"));
                assert_eq!(customer_id.as_deref(), Some("cus_1"));
                assert_eq!(subscription_id.as_deref(), Some("sub_1"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[tokio::test]
    async fn decodes_subscription_updated_with_snapshot() {
        let payload = event_payload(
            "customer.subscription.updated",
            json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "past_due",
                "current_period_start": 1704067200,
                "current_period_end": 1706745600,
                "items": {"data": [{"id": "si_1", "price": {"id": "price_1", "product": "prod_pro"}}]}
            }),
        );

        let event = verify(&payload).await.unwrap();

        match event.kind {
            BillingEventKind::SubscriptionUpdated { subscription } => {
                assert_eq!(subscription.status, "past_due");
                assert_eq!(subscription.product_id.as_deref(), Some("prod_pro"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[tokio::test]
    async fn decodes_invoice_paid_variants() {
        for event_type in ["invoice.payment_succeeded", "invoice.paid"] {
            let payload = event_payload(
                event_type,
                json!({"id": "in_1", "customer": "cus_1", "subscription": "sub_1"}),
            );

            let event = verify(&payload).await.unwrap();

            assert!(matches!(
                event.kind,
                BillingEventKind::InvoicePaymentSucceeded { .. }
            ));
        }
    }

    #[tokio::test]
    async fn decodes_invoice_payment_failed() {
        let payload = event_payload(
            "invoice.payment_failed",
            json!({"id": "in_1", "customer": "cus_1", "subscription": "sub_1", "attempt_count": 2}),
        );

        let event = verify(&payload).await.unwrap();

        match event.kind {
            BillingEventKind::InvoicePaymentFailed { attempt_count, .. } => {
                assert_eq!(attempt_count, 2);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_event_type_decodes_to_other() {
        let payload = event_payload("customer.created", json!({"id": "cus_1"}));

        let event = verify(&payload).await.unwrap();

        assert_eq!(
            event.kind,
            BillingEventKind::Other {
                event_type: "customer.created".to_string()
            }
        );
    }
}
