//! GetSubscriptionHandler - Query handler for the current record.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionRecord};
use crate::domain::foundation::UserId;
use crate::ports::SubscriptionStore;

/// Query for the calling user's subscription record.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// Read-side handler returning the record, or the free/inactive default
/// projection for users with no billing history.
pub struct GetSubscriptionHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl GetSubscriptionHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<SubscriptionRecord, BillingError> {
        let record = self.store.find_by_user_id(&query.user_id).await?;
        Ok(record.unwrap_or_else(|| SubscriptionRecord::default_for(query.user_id)))
    }
}
