//! Subscription tier definitions and product-to-tier resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Subscription tier.
///
/// Determines the entitlement level granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free tier - no paid entitlements.
    Free,

    /// Standard paid tier.
    Pro,

    /// Top paid tier.
    Premium,
}

impl SubscriptionTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the canonical lowercase name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more entitlements.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Pro => 1,
            SubscriptionTier::Premium => 2,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tier assigned when a paid product id has no mapping entry.
///
/// A missing mapping must never block the user's entitlement; resolution
/// soft-fails to this tier and the miss is logged for operators.
const DEFAULT_PAID_TIER: SubscriptionTier = SubscriptionTier::Pro;

/// Resolves a provider product id to a subscription tier.
///
/// The mapping table is assembled once from configuration. Resolution is
/// total: unmapped ids fall back to [`DEFAULT_PAID_TIER`] with a warning.
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    mappings: HashMap<String, SubscriptionTier>,
}

impl TierResolver {
    /// Creates a resolver over an exact-match product-id mapping table.
    pub fn new(mappings: HashMap<String, SubscriptionTier>) -> Self {
        Self { mappings }
    }

    /// Resolves a product id to its tier.
    ///
    /// Never fails; unmapped ids resolve to the default paid tier.
    pub fn resolve(&self, product_id: &str) -> SubscriptionTier {
        match self.mappings.get(product_id) {
            Some(tier) => *tier,
            None => {
                tracing::warn!(
                    product_id,
                    fallback = DEFAULT_PAID_TIER.as_str(),
                    "No tier mapping for product id, using default tier"
                );
                DEFAULT_PAID_TIER
            }
        }
    }
}
