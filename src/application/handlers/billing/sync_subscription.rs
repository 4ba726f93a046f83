//! SyncSubscriptionHandler - Caller-triggered re-pull of provider state.
//!
//! Drift-correction escape hatch: functionally a manual replay of the
//! subscription-updated reconciliation for the calling user.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, SubscriptionRecord, SubscriptionTier, TierResolver};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, SubscriptionStore};

/// Command to re-sync the calling user's subscription from the provider.
#[derive(Debug, Clone)]
pub struct SyncSubscriptionCommand {
    pub user_id: UserId,
}

/// Result of a sync attempt.
///
/// `success: false` means there was nothing to sync (no record or no
/// provider subscription on file) - that is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSubscriptionResult {
    pub success: bool,
    pub tier: SubscriptionTier,
    pub is_active: bool,
    pub status: String,
}

/// Handler for the manual sync operation.
pub struct SyncSubscriptionHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    tiers: Arc<TierResolver>,
}

impl SyncSubscriptionHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        tiers: Arc<TierResolver>,
    ) -> Self {
        Self {
            store,
            provider,
            tiers,
        }
    }

    pub async fn handle(
        &self,
        cmd: SyncSubscriptionCommand,
    ) -> Result<SyncSubscriptionResult, BillingError> {
        let record = self.store.find_by_user_id(&cmd.user_id).await?;

        let Some(record) = record else {
            return Ok(SyncSubscriptionResult {
                success: false,
                tier: SubscriptionTier::Free,
                is_active: false,
                status: String::new(),
            });
        };

        let Some(subscription_id) = record.stripe_subscription_id.clone() else {
            return Ok(SyncSubscriptionResult {
                success: false,
                tier: record.tier,
                is_active: record.is_active,
                status: record.provider_status,
            });
        };

        let snapshot = self
            .provider
            .fetch_subscription(&subscription_id)
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        let tier = self
            .tiers
            .resolve(snapshot.product_id.as_deref().unwrap_or_default());
        let refreshed = SubscriptionRecord::from_snapshot(cmd.user_id.clone(), &snapshot, tier);
        self.store.update(&refreshed).await?;

        tracing::info!(
            user_id = %cmd.user_id,
            tier = tier.as_str(),
            is_active = refreshed.is_active,
            "Subscription re-synced from provider"
        );

        Ok(SyncSubscriptionResult {
            success: true,
            tier: refreshed.tier,
            is_active: refreshed.is_active,
            status: refreshed.provider_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{BillingEvent, RecordPatch, SubscriptionSnapshot, WebhookError};
    use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
    use crate::ports::{PaymentError, PortalSession};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockSubscriptionStore {
        records: Mutex<HashMap<String, SubscriptionRecord>>,
    }

    impl MockSubscriptionStore {
        fn empty() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
            }
        }

        fn with_record(record: SubscriptionRecord) -> Self {
            let store = Self::empty();
            store
                .records
                .lock()
                .unwrap()
                .insert(record.user_id.as_str().to_string(), record);
            store
        }

        fn record_for(&self, user_id: &str) -> Option<SubscriptionRecord> {
            self.records.lock().unwrap().get(user_id).cloned()
        }
    }

    #[async_trait]
    impl SubscriptionStore for MockSubscriptionStore {
        async fn upsert_merge(
            &self,
            user_id: &UserId,
            patch: RecordPatch,
        ) -> Result<(), DomainError> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(user_id.as_str()) {
                Some(record) => patch.apply_to(record),
                None => {
                    records.insert(
                        user_id.as_str().to_string(),
                        patch.into_record(user_id.clone()),
                    );
                }
            }
            Ok(())
        }

        async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
            let mut records = self.records.lock().unwrap();
            if !records.contains_key(record.user_id.as_str()) {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    "no record for user",
                ));
            }
            records.insert(record.user_id.as_str().to_string(), record.clone());
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
            customer_id: &str,
        ) -> Result<Option<UserId>, DomainError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.stripe_customer_id.as_deref() == Some(customer_id))
                .map(|r| r.user_id.clone()))
        }
    }

    struct MockPaymentProvider {
        subscription: Option<SubscriptionSnapshot>,
    }

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn fetch_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<SubscriptionSnapshot, PaymentError> {
            self.subscription
                .clone()
                .ok_or_else(|| PaymentError::NotFound("subscription".to_string()))
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

    fn user_id() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn snapshot(status: &str, product_id: &str) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            subscription_id: "sub_123".to_string(),
            customer_id: "cus_123".to_string(),
            status: status.to_string(),
            product_id: Some(product_id.to_string()),
            period_start: Some(Timestamp::from_unix_secs(1704067200)),
            period_end: Some(Timestamp::from_unix_secs(1706745600)),
        }
    }

    fn resolver() -> Arc<TierResolver> {
        let mut mappings = HashMap::new();
        mappings.insert("prod_pro".to_string(), SubscriptionTier::Pro);
        mappings.insert("prod_premium".to_string(), SubscriptionTier::Premium);
        Arc::new(TierResolver::new(mappings))
    }

    #[tokio::test]
    async fn sync_without_record_returns_unsuccessful_default_state() {
        let store = Arc::new(MockSubscriptionStore::empty());
        let provider = Arc::new(MockPaymentProvider { subscription: None });
        let handler = SyncSubscriptionHandler::new(store, provider, resolver());

        let result = handler
            .handle(SyncSubscriptionCommand { user_id: user_id() })
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.tier, SubscriptionTier::Free);
        assert!(!result.is_active);
    }

    #[tokio::test]
    async fn sync_without_subscription_id_returns_current_state() {
        let mut record = SubscriptionRecord::default_for(user_id());
        record.stripe_customer_id = Some("cus_123".to_string());
        let store = Arc::new(MockSubscriptionStore::with_record(record));
        let provider = Arc::new(MockPaymentProvider { subscription: None });
        let handler = SyncSubscriptionHandler::new(store, provider, resolver());

        let result = handler
            .handle(SyncSubscriptionCommand { user_id: user_id() })
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.tier, SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn sync_refreshes_record_from_provider() {
        let record = SubscriptionRecord::from_snapshot(
            user_id(),
            &snapshot("active", "prod_pro"),
            SubscriptionTier::Pro,
        );
        let store = Arc::new(MockSubscriptionStore::with_record(record));
        let provider = Arc::new(MockPaymentProvider {
            subscription: Some(snapshot("canceled", "prod_premium")),
        });
        let handler = SyncSubscriptionHandler::new(store.clone(), provider, resolver());

        let result = handler
            .handle(SyncSubscriptionCommand { user_id: user_id() })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.tier, SubscriptionTier::Premium);
        assert!(!result.is_active);
        assert_eq!(result.status, "canceled");

        let stored = store.record_for("user-123").unwrap();
        assert_eq!(stored.tier, SubscriptionTier::Premium);
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn sync_surfaces_provider_failure_as_error() {
        let record = SubscriptionRecord::from_snapshot(
            user_id(),
            &snapshot("active", "prod_pro"),
            SubscriptionTier::Pro,
        );
        let store = Arc::new(MockSubscriptionStore::with_record(record));
        let provider = Arc::new(MockPaymentProvider { subscription: None });
        let handler = SyncSubscriptionHandler::new(store, provider, resolver());

        let result = handler
            .handle(SyncSubscriptionCommand { user_id: user_id() })
            .await;

        assert!(matches!(result, Err(BillingError::Provider(_))));
    }
}
