//! ProcessWebhookHandler - Command handler for payment provider webhooks.
//!
//! Verifies the delivery, then reconciles the decoded event onto the
//! per-user subscription record. Handlers re-derive the full record from
//! the event's own facts (or a live provider re-fetch) rather than
//! patching incrementally, so replays and out-of-order deliveries
//! converge on the same state.
//!
//! Permanent per-event conditions (no user reference, unknown customer)
//! degrade to a logged skip and the delivery is acknowledged; only
//! transient faults (store or provider unavailable) propagate, producing
//! a server error that tells the provider to redeliver later.

use std::sync::Arc;

use crate::domain::billing::{
    BillingEventKind, RecordPatch, SubscriptionRecord, SubscriptionSnapshot, SubscriptionTier,
    TierResolver, WebhookError,
};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, SubscriptionStore};

/// Command to process a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body bytes, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the provider signature header.
    pub signature: String,
}

/// Result of webhook reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessWebhookOutcome {
    /// Checkout completed; record created or re-activated.
    Activated { user_id: UserId },
    /// Subscription state re-derived and written.
    Updated { user_id: UserId },
    /// Subscription ended; record downgraded to free/inactive.
    Downgraded { user_id: UserId },
    /// Payment failure noted in the logs; no record mutation.
    FailureNoted,
    /// Event dropped as permanently unprocessable.
    Skipped { reason: String },
    /// Event type not handled by this service.
    Ignored { event_type: String },
}

/// Handler translating provider events into subscription record writes.
pub struct ProcessWebhookHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    tiers: Arc<TierResolver>,
}

impl ProcessWebhookHandler {
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
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        // Signature verification runs before any event interpretation.
        let event = self
            .provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await?;

        tracing::debug!(event_id = %event.id, kind = event.kind.name(), "Processing webhook event");

        match event.kind {
            BillingEventKind::CheckoutCompleted {
                session_id,
                user_id,
                customer_id: _,
                subscription_id,
            } => {
                self.handle_checkout_completed(&session_id, user_id, subscription_id)
                    .await
            }
            BillingEventKind::SubscriptionUpdated { subscription } => {
                self.apply_subscription_state(&subscription).await
            }
            BillingEventKind::SubscriptionDeleted { subscription } => {
                self.handle_subscription_deleted(&subscription).await
            }
            BillingEventKind::InvoicePaymentSucceeded {
                invoice_id,
                customer_id: _,
                subscription_id,
            } => {
                self.handle_invoice_payment_succeeded(&invoice_id, subscription_id)
                    .await
            }
            BillingEventKind::InvoicePaymentFailed {
                invoice_id,
                customer_id,
                subscription_id: _,
                attempt_count,
            } => {
                self.handle_invoice_payment_failed(&invoice_id, &customer_id, attempt_count)
                    .await
            }
            BillingEventKind::Other { event_type } => {
                tracing::debug!(%event_type, "Ignoring unhandled event type");
                Ok(ProcessWebhookOutcome::Ignored { event_type })
            }
        }
    }

    /// First activation: fetch the full subscription from the provider and
    /// merge-write the record keyed by the checkout's user reference.
    async fn handle_checkout_completed(
        &self,
        session_id: &str,
        user_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        let Some(user_id) = user_id.and_then(|id| UserId::new(id).ok()) else {
            tracing::warn!(session_id, "Checkout session carries no user reference, dropping event");
            return Ok(ProcessWebhookOutcome::Skipped {
                reason: "checkout session has no user reference".to_string(),
            });
        };

        let Some(subscription_id) = subscription_id else {
            tracing::warn!(
                session_id,
                %user_id,
                "Checkout session has no subscription attached, dropping event"
            );
            return Ok(ProcessWebhookOutcome::Skipped {
                reason: "checkout session has no subscription".to_string(),
            });
        };

        let snapshot = self.provider.fetch_subscription(&subscription_id).await?;
        let tier = self.resolve_tier(&snapshot);
        let patch = RecordPatch::from_snapshot(&snapshot, tier);

        self.store.upsert_merge(&user_id, patch).await?;

        tracing::info!(%user_id, subscription_id, tier = tier.as_str(), "Subscription activated");
        Ok(ProcessWebhookOutcome::Activated { user_id })
    }

    /// Re-derives and writes the full record from a subscription snapshot.
    ///
    /// Shared by `subscription.updated` and the invoice-paid refresh path.
    async fn apply_subscription_state(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        let Some(user_id) = self
            .store
            .find_user_by_customer_id(&snapshot.customer_id)
            .await?
        else {
            tracing::warn!(
                customer_id = %snapshot.customer_id,
                subscription_id = %snapshot.subscription_id,
                "No user on record for provider customer, dropping event"
            );
            return Ok(ProcessWebhookOutcome::Skipped {
                reason: format!("no user for customer {}", snapshot.customer_id),
            });
        };

        let tier = self.resolve_tier(snapshot);
        let record = SubscriptionRecord::from_snapshot(user_id.clone(), snapshot, tier);
        self.store.update(&record).await?;

        tracing::info!(
            %user_id,
            tier = tier.as_str(),
            is_active = record.is_active,
            status = %snapshot.status,
            "Subscription record updated"
        );
        Ok(ProcessWebhookOutcome::Updated { user_id })
    }

    /// Downgrade on subscription end. Provider ids are retained as the
    /// historical entitlement record; the record is never deleted.
    async fn handle_subscription_deleted(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        let Some(user_id) = self
            .store
            .find_user_by_customer_id(&snapshot.customer_id)
            .await?
        else {
            tracing::warn!(
                customer_id = %snapshot.customer_id,
                "No user on record for deleted subscription, dropping event"
            );
            return Ok(ProcessWebhookOutcome::Skipped {
                reason: format!("no user for customer {}", snapshot.customer_id),
            });
        };

        let patch = RecordPatch {
            tier: Some(SubscriptionTier::Free),
            is_active: Some(false),
            period_end: snapshot.period_end,
            provider_status: Some(snapshot.status.clone()),
            ..Default::default()
        };
        self.store.upsert_merge(&user_id, patch).await?;

        tracing::info!(%user_id, status = %snapshot.status, "Subscription ended, record downgraded");
        Ok(ProcessWebhookOutcome::Downgraded { user_id })
    }

    /// Payment success is just another trigger to refresh the full
    /// subscription snapshot, not a distinct state transition.
    async fn handle_invoice_payment_succeeded(
        &self,
        invoice_id: &str,
        subscription_id: Option<String>,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        let Some(subscription_id) = subscription_id else {
            tracing::debug!(invoice_id, "Invoice has no subscription reference, nothing to refresh");
            return Ok(ProcessWebhookOutcome::Skipped {
                reason: "invoice has no subscription reference".to_string(),
            });
        };

        let snapshot = self.provider.fetch_subscription(&subscription_id).await?;
        self.apply_subscription_state(&snapshot).await
    }

    /// Log-only: the provider's own retry schedule is the source of truth;
    /// entitlement changes only when a later subscription event arrives.
    async fn handle_invoice_payment_failed(
        &self,
        invoice_id: &str,
        customer_id: &str,
        attempt_count: i32,
    ) -> Result<ProcessWebhookOutcome, WebhookError> {
        match self.store.find_user_by_customer_id(customer_id).await? {
            Some(user_id) => {
                tracing::warn!(
                    %user_id,
                    invoice_id,
                    attempt_count,
                    "Invoice payment failed, awaiting provider retry"
                );
            }
            None => {
                tracing::warn!(
                    customer_id,
                    invoice_id,
                    "Invoice payment failed for unknown customer"
                );
            }
        }
        Ok(ProcessWebhookOutcome::FailureNoted)
    }

    fn resolve_tier(&self, snapshot: &SubscriptionSnapshot) -> SubscriptionTier {
        self.tiers
            .resolve(snapshot.product_id.as_deref().unwrap_or_default())
    }
}
