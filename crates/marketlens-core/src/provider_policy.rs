use std::time::Duration;

use crate::ProviderId;

/// Request quota published by a free-tier provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    pub fn twelvedata_default() -> Self {
        Self {
            provider_id: ProviderId::Twelvedata,
            quota_window: Duration::from_secs(60),
            quota_limit: 8,
        }
    }

    pub fn newsapi_default() -> Self {
        Self {
            provider_id: ProviderId::Newsapi,
            quota_window: Duration::from_secs(24 * 60 * 60),
            quota_limit: 100,
        }
    }

    /// Quota for providers that publish one; keyless feeds are unthrottled.
    pub fn default_for(provider_id: ProviderId) -> Option<Self> {
        match provider_id {
            ProviderId::Alphavantage => Some(Self::alphavantage_default()),
            ProviderId::Twelvedata => Some(Self::twelvedata_default()),
            ProviderId::Newsapi => Some(Self::newsapi_default()),
            ProviderId::Yahoo
            | ProviderId::Moneycontrol
            | ProviderId::Economictimes
            | ProviderId::Businessstandard
            | ProviderId::Fallback => None,
        }
    }
}
