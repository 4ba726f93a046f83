//! Subscription store port.
//!
//! The store holds one record per application user and supports
//! document-style partial writes: correctness under concurrent webhook
//! deliveries relies on per-record atomic merges plus idempotent handlers,
//! not on application-level locking.

use async_trait::async_trait;

use crate::domain::billing::{RecordPatch, SubscriptionRecord};
use crate::domain::foundation::{DomainError, UserId};

/// Port for the per-user subscription record store.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Create-or-merge keyed by user id.
    ///
    /// Fields absent from the patch keep their stored value; a missing
    /// record is created from the patch over defaults.
    async fn upsert_merge(&self, user_id: &UserId, patch: RecordPatch)
        -> Result<(), DomainError>;

    /// Full update of an existing record.
    ///
    /// Errors with `SubscriptionNotFound` if no record exists for the
    /// record's user id.
    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Fetch the record for a user, if any.
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Reverse lookup from provider customer id, limited to one match.
    ///
    /// Zero matches means the event referencing this customer is
    /// unprocessable, not that the store failed.
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError>;
}
