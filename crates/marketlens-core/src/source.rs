use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Data capability served by an ordered provider chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Quote,
    News,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::News => "news",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical provider identifiers used for provenance tags and configuration.
///
/// `Fallback` tags the deterministic synthetic source that terminates every chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Alphavantage,
    Twelvedata,
    Moneycontrol,
    Economictimes,
    Businessstandard,
    Newsapi,
    Fallback,
}

impl ProviderId {
    pub const ALL: [Self; 8] = [
        Self::Yahoo,
        Self::Alphavantage,
        Self::Twelvedata,
        Self::Moneycontrol,
        Self::Economictimes,
        Self::Businessstandard,
        Self::Newsapi,
        Self::Fallback,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Alphavantage => "alphavantage",
            Self::Twelvedata => "twelvedata",
            Self::Moneycontrol => "moneycontrol",
            Self::Economictimes => "economictimes",
            Self::Businessstandard => "businessstandard",
            Self::Newsapi => "newsapi",
            Self::Fallback => "fallback",
        }
    }

    /// Capability served by this provider; `None` for the synthetic source.
    pub const fn capability(self) -> Option<Capability> {
        match self {
            Self::Yahoo | Self::Alphavantage | Self::Twelvedata => Some(Capability::Quote),
            Self::Moneycontrol | Self::Economictimes | Self::Businessstandard | Self::Newsapi => {
                Some(Capability::News)
            }
            Self::Fallback => None,
        }
    }

    /// Human-readable publisher label used on news items.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Yahoo => "Yahoo Finance",
            Self::Alphavantage => "Alpha Vantage",
            Self::Twelvedata => "Twelve Data",
            Self::Moneycontrol => "MoneyControl",
            Self::Economictimes => "Economic Times",
            Self::Businessstandard => "Business Standard",
            Self::Newsapi => "NewsAPI",
            Self::Fallback => "Fallback",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == normalized)
            .ok_or(ValidationError::InvalidProvider { value: normalized })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_case_insensitively() {
        assert_eq!("  TwelveData ".parse::<ProviderId>(), Ok(ProviderId::Twelvedata));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "polygon".parse::<ProviderId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidProvider { .. }));
    }

    #[test]
    fn fallback_serves_no_capability() {
        assert_eq!(ProviderId::Fallback.capability(), None);
        assert_eq!(ProviderId::Newsapi.capability(), Some(Capability::News));
    }
}
