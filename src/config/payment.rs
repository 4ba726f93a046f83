//! Payment configuration (Stripe)

use std::collections::HashMap;

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::SubscriptionTier;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Stripe product ID mapped to the Pro tier
    pub pro_product_id: Option<String>,

    /// Stripe product ID mapped to the Premium tier
    pub premium_product_id: Option<String>,

    /// URL the billing portal returns the customer to
    #[serde(default = "default_portal_return_url")]
    pub portal_return_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Build the product-to-tier mapping table for tier resolution.
    pub fn tier_mappings(&self) -> HashMap<String, SubscriptionTier> {
        let mut mappings = HashMap::new();
        if let Some(id) = &self.pro_product_id {
            mappings.insert(id.clone(), SubscriptionTier::Pro);
        }
        if let Some(id) = &self.premium_product_id {
            mappings.insert(id.clone(), SubscriptionTier::Premium);
        }
        mappings
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        Ok(())
    }
}

fn default_portal_return_url() -> String {
    "/account/billing".to_string()
}
