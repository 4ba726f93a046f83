//! Per-user subscription record and merge patch.

use serde::{Deserialize, Serialize};

use super::event::SubscriptionSnapshot;
use super::status::ProviderStatus;
use super::tier::SubscriptionTier;
use crate::domain::foundation::{Timestamp, UserId};

/// The reconciled subscription state for one application user.
///
/// Exactly one record exists per user id. Created at the first successful
/// checkout completion and never deleted: a subscription that ends is
/// downgraded to Free/inactive and kept as the historical entitlement
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,

    /// Current entitlement level.
    pub tier: SubscriptionTier,

    /// Whether entitlement should be granted right now. Derived from the
    /// provider status via the entitlement allow-list, never set
    /// independently of a status transition.
    pub is_active: bool,

    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,

    /// Provider subscription handle; set on first activation.
    pub stripe_subscription_id: Option<String>,

    /// Provider customer handle; immutable once set. Join key for events
    /// that carry only the customer id.
    pub stripe_customer_id: Option<String>,

    /// Product id that drove tier resolution.
    pub stripe_product_id: Option<String>,

    /// Last-seen raw provider status, retained for diagnostics.
    pub provider_status: String,

    /// Set by the store on every write.
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Default projection for a user with no billing history.
    pub fn default_for(user_id: UserId) -> Self {
        Self {
            user_id,
            tier: SubscriptionTier::Free,
            is_active: false,
            period_start: None,
            period_end: None,
            stripe_subscription_id: None,
            stripe_customer_id: None,
            stripe_product_id: None,
            provider_status: String::new(),
            updated_at: Timestamp::now(),
        }
    }

    /// Re-derives the full record from a provider subscription snapshot.
    ///
    /// `is_active` is computed from the snapshot status via the
    /// entitlement allow-list; nothing is patched incrementally, which is
    /// what makes replay and out-of-order delivery converge.
    pub fn from_snapshot(
        user_id: UserId,
        snapshot: &SubscriptionSnapshot,
        tier: SubscriptionTier,
    ) -> Self {
        let status = ProviderStatus::from_provider(&snapshot.status);
        Self {
            user_id,
            tier,
            is_active: status.is_entitled(),
            period_start: snapshot.period_start,
            period_end: snapshot.period_end,
            stripe_subscription_id: Some(snapshot.subscription_id.clone()),
            stripe_customer_id: Some(snapshot.customer_id.clone()),
            stripe_product_id: snapshot.product_id.clone(),
            provider_status: snapshot.status.clone(),
            updated_at: Timestamp::now(),
        }
    }
}

/// Partial update with merge semantics.
///
/// Fields left `None` keep their stored value. The Postgres store mirrors
/// this with SQL `COALESCE`; in-memory doubles use [`RecordPatch::apply_to`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub tier: Option<SubscriptionTier>,
    pub is_active: Option<bool>,
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_product_id: Option<String>,
    pub provider_status: Option<String>,
}

impl RecordPatch {
    /// Builds the full activation patch from a subscription snapshot.
    pub fn from_snapshot(snapshot: &SubscriptionSnapshot, tier: SubscriptionTier) -> Self {
        let status = ProviderStatus::from_provider(&snapshot.status);
        Self {
            tier: Some(tier),
            is_active: Some(status.is_entitled()),
            period_start: snapshot.period_start,
            period_end: snapshot.period_end,
            stripe_subscription_id: Some(snapshot.subscription_id.clone()),
            stripe_customer_id: Some(snapshot.customer_id.clone()),
            stripe_product_id: snapshot.product_id.clone(),
            provider_status: Some(snapshot.status.clone()),
        }
    }

    /// Merges this patch into an existing record.
    pub fn apply_to(&self, record: &mut SubscriptionRecord) {
        if let Some(tier) = self.tier {
            record.tier = tier;
        }
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        if let Some(period_start) = self.period_start {
            record.period_start = Some(period_start);
        }
        if let Some(period_end) = self.period_end {
            record.period_end = Some(period_end);
        }
        if let Some(subscription_id) = &self.stripe_subscription_id {
            record.stripe_subscription_id = Some(subscription_id.clone());
        }
        if let Some(customer_id) = &self.stripe_customer_id {
            record.stripe_customer_id = Some(customer_id.clone());
        }
        if let Some(product_id) = &self.stripe_product_id {
            record.stripe_product_id = Some(product_id.clone());
        }
        if let Some(provider_status) = &self.provider_status {
            record.provider_status = provider_status.clone();
        }
        record.updated_at = Timestamp::now();
    }

    /// Materializes a fresh record for a user with no existing row.
    pub fn into_record(self, user_id: UserId) -> SubscriptionRecord {
        let mut record = SubscriptionRecord::default_for(user_id);
        self.apply_to(&mut record);
        record
    }
}
