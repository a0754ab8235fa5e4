//! Subscription-tier to provider routing.
//!
//! Pure mapping, no I/O. Parsing is total and fail-open: tier is optional
//! (anonymous or under-provisioned callers), so an absent or unrecognized
//! value routes the same as `free` rather than failing the request.

use crate::provider::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    Free,
    Premium,
    Upgrade,
}

impl SubscriptionTier {
    /// Total over any input; anything that is not a known paid tier is `Free`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("premium") => SubscriptionTier::Premium,
            Some("upgrade") => SubscriptionTier::Upgrade,
            _ => SubscriptionTier::Free,
        }
    }

    /// The upstream provider this tier is entitled to.
    pub fn provider_id(&self) -> ProviderId {
        match self {
            SubscriptionTier::Free => ProviderId::OpenWeatherMap,
            SubscriptionTier::Premium => ProviderId::WeatherApi,
            SubscriptionTier::Upgrade => ProviderId::VisualCrossing,
        }
    }
}

/// Resolve a raw tier string straight to a provider identity.
pub fn route_tier(raw: Option<&str>) -> ProviderId {
    SubscriptionTier::parse(raw).provider_id()
}
