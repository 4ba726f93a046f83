//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_portal_url, get_subscription, handle_stripe_webhook, sync_subscription, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes (require authentication)
/// - `GET /` - Get current user's subscription record
/// - `GET /portal` - Get a provider billing portal URL
/// - `POST /sync` - Force a re-pull of provider state
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/portal", get(get_portal_url))
        .route("/sync", post(sync_subscription))
}

/// Create the webhook router.
///
/// Separate from the billing routes because webhooks carry no user
/// authentication; they are verified via the provider signature.
///
/// # Routes
/// - `POST /stripe` - Handle provider webhook deliveries
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing module router, suitable for mounting at
/// `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::domain::billing::{
        BillingEvent, RecordPatch, SubscriptionRecord, SubscriptionSnapshot, TierResolver,
        WebhookError,
    };
    use crate::domain::foundation::{DomainError, UserId};
    use crate::ports::{
        PaymentError, PaymentProvider, PortalSession, SubscriptionStore,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSubscriptionStore {
        records: Mutex<HashMap<String, SubscriptionRecord>>,
    }

    #[async_trait]
    impl SubscriptionStore for MockSubscriptionStore {
        async fn upsert_merge(
            &self,
            user_id: &UserId,
            patch: RecordPatch,
        ) -> Result<(), DomainError> {
            self.records.lock().unwrap().insert(
                user_id.as_str().to_string(),
                patch.into_record(user_id.clone()),
            );
            Ok(())
        }

        async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
            self.records
                .lock()
                .unwrap()
                .insert(record.user_id.as_str().to_string(), record.clone());
            Ok(())
        }

        async fn find_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<SubscriptionRecord>, DomainError> {
            Ok(self.records.lock().unwrap().get(user_id.as_str()).cloned())
        }

        async fn find_user_by_customer_id(
            &self,
            _customer_id: &str,
        ) -> Result<Option<UserId>, DomainError> {
            Ok(None)
        }
    }

    struct MockPaymentProvider;

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn fetch_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<SubscriptionSnapshot, PaymentError> {
            Err(PaymentError::NotFound("subscription".to_string()))
        }

        async fn create_portal_session(
            &self,
            _customer_id: &str,
            _return_url: &str,
        ) -> Result<PortalSession, PaymentError> {
            Ok(PortalSession {
                id: "bps_test".to_string(),
                url: "https://billing.stripe.com/test".to_string(),
            })
        }

        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<BillingEvent, WebhookError> {
            Err(WebhookError::InvalidSignature)
        }
    }

    fn test_state() -> BillingAppState {
        BillingAppState {
            subscription_store: Arc::new(MockSubscriptionStore {
                records: Mutex::new(HashMap::new()),
            }),
            payment_provider: Arc::new(MockPaymentProvider),
            tier_resolver: Arc::new(TierResolver::new(HashMap::new())),
            portal_return_url: "/account/billing".to_string(),
        }
    }

    #[test]
    fn billing_routes_creates_router() {
        let router = billing_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let router = webhook_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn billing_router_creates_combined_router() {
        let router = billing_router();
        let _: Router<()> = router.with_state(test_state());
    }
}
