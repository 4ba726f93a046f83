//! Provider subscription status and the entitlement policy.

use serde::{Deserialize, Serialize};

/// Subscription status as reported by the payment provider.
///
/// Parsed from the provider's raw status string; unrecognized values map
/// to `Unknown` so that new provider statuses never break dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Subscription is paid up and current.
    Active,

    /// Subscription is in a trial period.
    Trialing,

    /// Payment failed; provider is retrying.
    PastDue,

    /// Subscription was canceled.
    Canceled,

    /// Payment retries exhausted.
    Unpaid,

    /// Initial payment not yet completed.
    Incomplete,

    /// Initial payment window elapsed without completion.
    IncompleteExpired,

    /// Subscription is paused.
    Paused,

    /// Status string not recognized.
    Unknown,
}

impl ProviderStatus {
    /// Parses a raw provider status string. Total; never fails.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }

    /// Returns true if this status should retain entitlement.
    ///
    /// Allow-list: active, trialing, and past_due - the last included to
    /// give a grace window while a payment retry is in flight upstream.
    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_entitled() {
        assert!(ProviderStatus::from_provider("active").is_entitled());
    }

    #[test]
    fn trialing_is_entitled() {
        assert!(ProviderStatus::from_provider("trialing").is_entitled());
    }

    #[test]
    fn past_due_is_entitled_for_grace_window() {
        assert!(ProviderStatus::from_provider("past_due").is_entitled());
    }

    #[test]
    fn canceled_is_not_entitled() {
        assert!(!ProviderStatus::from_provider("canceled").is_entitled());
    }

    #[test]
    fn unpaid_is_not_entitled() {
        assert!(!ProviderStatus::from_provider("unpaid").is_entitled());
    }

    #[test]
    fn incomplete_statuses_are_not_entitled() {
        assert!(!ProviderStatus::from_provider("incomplete").is_entitled());
        assert!(!ProviderStatus::from_provider("incomplete_expired").is_entitled());
    }

    #[test]
    fn unrecognized_status_parses_to_unknown() {
        let status = ProviderStatus::from_provider("some_future_status");
        assert_eq!(status, ProviderStatus::Unknown);
        assert!(!status.is_entitled());
    }

    #[test]
    fn empty_status_is_not_entitled() {
        assert!(!ProviderStatus::from_provider("").is_entitled());
    }
}
