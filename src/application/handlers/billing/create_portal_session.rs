//! CreatePortalSessionHandler - Mint a provider-hosted billing portal URL.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, SubscriptionStore};

/// Command to create a billing portal session for the calling user.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    pub user_id: UserId,
}

/// Result carrying the portal URL, returned to the caller verbatim.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionResult {
    pub portal_url: String,
}

/// Handler for portal session creation.
///
/// Requires the user to have a provider customer on record; a user who
/// never completed checkout has nothing to manage.
pub struct CreatePortalSessionHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    return_url: String,
}

impl CreatePortalSessionHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            return_url: return_url.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<CreatePortalSessionResult, BillingError> {
        let record = self
            .store
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(cmd.user_id.clone()))?;

        let customer_id = record
            .stripe_customer_id
            .ok_or_else(|| BillingError::NoCustomer(cmd.user_id.clone()))?;

        let session = self
            .provider
            .create_portal_session(&customer_id, &self.return_url)
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        Ok(CreatePortalSessionResult {
            portal_url: session.url,
        })
    }
}
