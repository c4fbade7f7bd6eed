//! Runtime configuration.
//!
//! Loading order is defaults, then an optional JSON file, then environment
//! variables. Durations are written in milliseconds in the file format
//! (`quote_ttl_ms`, `provider_timeout_ms`, ...).

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::news::RelevanceFilter;
use crate::projector::{ProjectorError, ProjectorTables};
use crate::scoring::{RuleTable, RuleTableError};
use crate::source::Capability;
use crate::ProviderId;

pub const CONFIG_PATH_ENV: &str = "MARKETLENS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("quote_ttl must be greater than zero")]
    ZeroQuoteTtl,
    #[error("timeout for {scope} must be greater than zero")]
    ZeroTimeout { scope: String },
    #[error("{capability} provider order cannot be empty")]
    EmptyProviderOrder { capability: Capability },
    #[error("provider '{provider}' is listed more than once")]
    DuplicateProvider { provider: ProviderId },
    #[error("provider '{provider}' cannot serve {capability}")]
    WrongCapability {
        provider: ProviderId,
        capability: Capability,
    },
    #[error(transparent)]
    Rules(#[from] RuleTableError),
    #[error(transparent)]
    Projector(#[from] ProjectorError),
}

/// Upstream credentials. `Debug` never prints key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub alphavantage: String,
    pub twelvedata: String,
    pub newsapi: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            alphavantage: String::from("demo"),
            twelvedata: String::from("demo"),
            newsapi: None,
        }
    }
}

impl Debug for ApiKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mask = |key: &str| if key.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("ApiKeys")
            .field("alphavantage", &mask(&self.alphavantage))
            .field("twelvedata", &mask(&self.twelvedata))
            .field("newsapi", &self.newsapi.as_deref().map(mask))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketLensConfig {
    #[serde(rename = "quote_ttl_ms", with = "millis")]
    pub quote_ttl: Duration,
    /// One second in the deployed system, which all but disables news caching.
    #[serde(rename = "news_ttl_ms", with = "millis")]
    pub news_ttl: Duration,
    pub quote_providers: Vec<ProviderId>,
    pub news_providers: Vec<ProviderId>,
    #[serde(rename = "provider_timeout_ms", with = "millis")]
    pub provider_timeout: Duration,
    #[serde(rename = "provider_timeouts_ms", with = "millis_map")]
    pub provider_timeouts: BTreeMap<ProviderId, Duration>,
    #[serde(rename = "request_deadline_ms", with = "millis")]
    pub request_deadline: Duration,
    pub market_suffix: String,
    pub api_keys: ApiKeys,
    pub relevance: RelevanceFilter,
    pub rules: RuleTable,
    pub rule_weights: BTreeMap<String, u32>,
    pub projector: ProjectorTables,
    /// Replacement analytics table; the built-in table is used when unset.
    pub snapshots_path: Option<PathBuf>,
}

impl Default for MarketLensConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::from_secs(60),
            news_ttl: Duration::from_secs(1),
            quote_providers: vec![
                ProviderId::Yahoo,
                ProviderId::Alphavantage,
                ProviderId::Twelvedata,
            ],
            news_providers: vec![
                ProviderId::Moneycontrol,
                ProviderId::Economictimes,
                ProviderId::Businessstandard,
                ProviderId::Newsapi,
            ],
            provider_timeout: Duration::from_secs(5),
            provider_timeouts: BTreeMap::new(),
            request_deadline: Duration::from_secs(12),
            market_suffix: String::from(".NS"),
            api_keys: ApiKeys::default(),
            relevance: RelevanceFilter::default(),
            rules: RuleTable::standard(),
            rule_weights: BTreeMap::new(),
            projector: ProjectorTables::default(),
            snapshots_path: None,
        }
    }
}

impl MarketLensConfig {
    pub fn builder() -> MarketLensConfigBuilder {
        MarketLensConfigBuilder::default()
    }

    /// Defaults, then `path` (or `MARKETLENS_CONFIG`), then the process
    /// environment. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty());
        let config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        let config = config.with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON file on top of defaults. Not validated.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`; `MARKETLENS_`-prefixed names win
    /// over the bare provider names.
    pub fn with_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |primary: &str, secondary: &str| {
            lookup(primary)
                .or_else(|| lookup(secondary))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(key) = read("MARKETLENS_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY") {
            self.api_keys.alphavantage = key;
        }
        if let Some(key) = read("MARKETLENS_TWELVEDATA_API_KEY", "TWELVEDATA_API_KEY") {
            self.api_keys.twelvedata = key;
        }
        if let Some(key) = read("MARKETLENS_NEWSAPI_API_KEY", "NEWSAPI_API_KEY") {
            self.api_keys.newsapi = Some(key);
        }
        if let Some(raw) = lookup("MARKETLENS_QUOTE_TTL_MS") {
            self.quote_ttl = parse_millis("MARKETLENS_QUOTE_TTL_MS", &raw)?;
        }
        if let Some(raw) = lookup("MARKETLENS_NEWS_TTL_MS") {
            self.news_ttl = parse_millis("MARKETLENS_NEWS_TTL_MS", &raw)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quote_ttl.is_zero() {
            return Err(ConfigError::ZeroQuoteTtl);
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                scope: String::from("providers"),
            });
        }
        if self.request_deadline.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                scope: String::from("request deadline"),
            });
        }
        if let Some(provider) = self
            .provider_timeouts
            .iter()
            .find_map(|(provider, timeout)| timeout.is_zero().then_some(*provider))
        {
            return Err(ConfigError::ZeroTimeout {
                scope: provider.to_string(),
            });
        }

        validate_order(Capability::Quote, &self.quote_providers)?;
        validate_order(Capability::News, &self.news_providers)?;

        self.rule_table()?;
        self.projector.validate()?;
        Ok(())
    }

    /// The configured rule table with weight overrides applied.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        self.rules.validate()?;
        Ok(self.rules.clone().with_weight_overrides(&self.rule_weights)?)
    }

    pub fn timeout_for(&self, provider: ProviderId) -> Duration {
        self.provider_timeouts
            .get(&provider)
            .copied()
            .unwrap_or(self.provider_timeout)
    }
}

fn validate_order(capability: Capability, order: &[ProviderId]) -> Result<(), ConfigError> {
    if order.is_empty() {
        return Err(ConfigError::EmptyProviderOrder { capability });
    }
    let mut seen = HashSet::new();
    for provider in order {
        if provider.capability() != Some(capability) {
            return Err(ConfigError::WrongCapability {
                provider: *provider,
                capability,
            });
        }
        if !seen.insert(*provider) {
            return Err(ConfigError::DuplicateProvider {
                provider: *provider,
            });
        }
    }
    Ok(())
}

fn parse_millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidEnv {
            name,
            value: raw.to_owned(),
        })
}

/// Builder over [`MarketLensConfig`]; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct MarketLensConfigBuilder {
    config: MarketLensConfig,
}

impl MarketLensConfigBuilder {
    pub fn quote_ttl(mut self, ttl: Duration) -> Self {
        self.config.quote_ttl = ttl;
        self
    }

    pub fn news_ttl(mut self, ttl: Duration) -> Self {
        self.config.news_ttl = ttl;
        self
    }

    pub fn quote_providers(mut self, providers: impl Into<Vec<ProviderId>>) -> Self {
        self.config.quote_providers = providers.into();
        self
    }

    pub fn news_providers(mut self, providers: impl Into<Vec<ProviderId>>) -> Self {
        self.config.news_providers = providers.into();
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = timeout;
        self
    }

    pub fn provider_timeout_override(mut self, provider: ProviderId, timeout: Duration) -> Self {
        self.config.provider_timeouts.insert(provider, timeout);
        self
    }

    pub fn request_deadline(mut self, deadline: Duration) -> Self {
        self.config.request_deadline = deadline;
        self
    }

    pub fn market_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.market_suffix = suffix.into();
        self
    }

    pub fn api_keys(mut self, api_keys: ApiKeys) -> Self {
        self.config.api_keys = api_keys;
        self
    }

    pub fn relevance(mut self, relevance: RelevanceFilter) -> Self {
        self.config.relevance = relevance;
        self
    }

    pub fn rules(mut self, rules: RuleTable) -> Self {
        self.config.rules = rules;
        self
    }

    pub fn rule_weight(mut self, rule_id: impl Into<String>, weight: u32) -> Self {
        self.config.rule_weights.insert(rule_id.into(), weight);
        self
    }

    pub fn projector(mut self, tables: ProjectorTables) -> Self {
        self.config.projector = tables;
        self
    }

    pub fn snapshots_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshots_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<MarketLensConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_map {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::ProviderId;

    pub fn serialize<S: Serializer>(
        value: &BTreeMap<ProviderId, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .iter()
            .map(|(provider, timeout)| {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                (*provider, millis)
            })
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ProviderId, Duration>, D::Error> {
        let raw = BTreeMap::<ProviderId, u64>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(provider, millis)| (provider, Duration::from_millis(millis)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_deployed_values() {
        let config = MarketLensConfig::default();
        config.validate().expect("defaults validate");

        assert_eq!(config.quote_ttl, Duration::from_secs(60));
        assert_eq!(config.news_ttl, Duration::from_secs(1));
        assert_eq!(config.quote_providers[0], ProviderId::Yahoo);
        assert_eq!(config.market_suffix, ".NS");
        assert_eq!(config.api_keys.alphavantage, "demo");
        assert_eq!(config.api_keys.newsapi, None);
    }

    #[test]
    fn debug_output_redacts_keys() {
        let keys = ApiKeys {
            alphavantage: String::from("secret-av"),
            twelvedata: String::new(),
            newsapi: Some(String::from("secret-news")),
        };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("<empty>"));
    }

    #[test]
    fn env_prefers_prefixed_names() {
        let env = HashMap::from([
            ("MARKETLENS_ALPHAVANTAGE_API_KEY", "prefixed"),
            ("ALPHAVANTAGE_API_KEY", "bare"),
            ("NEWSAPI_API_KEY", "news-key"),
            ("MARKETLENS_QUOTE_TTL_MS", "1500"),
        ]);
        let config = MarketLensConfig::default()
            .with_env_from(|name| env.get(name).map(|value| value.to_string()))
            .expect("valid env");

        assert_eq!(config.api_keys.alphavantage, "prefixed");
        assert_eq!(config.api_keys.twelvedata, "demo");
        assert_eq!(config.api_keys.newsapi.as_deref(), Some("news-key"));
        assert_eq!(config.quote_ttl, Duration::from_millis(1500));
    }

    #[test]
    fn malformed_ttl_env_is_rejected() {
        let error = MarketLensConfig::default()
            .with_env_from(|name| (name == "MARKETLENS_NEWS_TTL_MS").then(|| String::from("soon")))
            .expect_err("not a number");
        assert!(matches!(error, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn validation_rejects_bad_orders() {
        let wrong = MarketLensConfig::builder()
            .quote_providers([ProviderId::Yahoo, ProviderId::Newsapi])
            .build()
            .expect_err("news provider in quote chain");
        assert!(matches!(wrong, ConfigError::WrongCapability { .. }));

        let duplicate = MarketLensConfig::builder()
            .news_providers([ProviderId::Moneycontrol, ProviderId::Moneycontrol])
            .build()
            .expect_err("duplicate");
        assert!(matches!(duplicate, ConfigError::DuplicateProvider { .. }));

        let empty = MarketLensConfig::builder()
            .quote_providers(Vec::<ProviderId>::new())
            .build()
            .expect_err("empty");
        assert!(matches!(empty, ConfigError::EmptyProviderOrder { .. }));

        let fallback = MarketLensConfig::builder()
            .quote_providers([ProviderId::Fallback])
            .build()
            .expect_err("synthetic source is implicit");
        assert!(matches!(fallback, ConfigError::WrongCapability { .. }));
    }

    #[test]
    fn validation_rejects_zero_durations() {
        assert!(matches!(
            MarketLensConfig::builder().quote_ttl(Duration::ZERO).build(),
            Err(ConfigError::ZeroQuoteTtl)
        ));
        assert!(matches!(
            MarketLensConfig::builder()
                .provider_timeout_override(ProviderId::Yahoo, Duration::ZERO)
                .build(),
            Err(ConfigError::ZeroTimeout { .. })
        ));
    }

    #[test]
    fn unknown_rule_weight_is_rejected() {
        let error = MarketLensConfig::builder()
            .rule_weight("risk.nonexistent", 3)
            .build()
            .expect_err("unknown rule");
        assert!(matches!(error, ConfigError::Rules(RuleTableError::UnknownRule { .. })));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: MarketLensConfig = serde_json::from_str(
            r#"{"quote_ttl_ms": 30000, "provider_timeouts_ms": {"yahoo": 2000}}"#,
        )
        .expect("parses");

        assert_eq!(config.quote_ttl, Duration::from_secs(30));
        assert_eq!(config.timeout_for(ProviderId::Yahoo), Duration::from_secs(2));
        assert_eq!(config.timeout_for(ProviderId::Twelvedata), Duration::from_secs(5));
        assert_eq!(config.news_providers.len(), 4);
    }
}
