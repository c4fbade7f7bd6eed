//! # MarketLens Core
//!
//! Market quotes, news and trade recommendations for a fixed equity universe.
//!
//! ## Overview
//!
//! The crate has two halves:
//!
//! - **Acquisition**: ordered provider fallback with a time-bounded cache. A
//!   caller always gets a value; when every upstream fails it is a
//!   deterministic synthetic value tagged `source = fallback`, `synthetic = true`.
//! - **Recommendation**: a data-driven rule table scores a live quote against an
//!   [`AnalyticsSnapshot`], and threshold tables project the net score into an
//!   action, target, stop-loss, timeframe and risk level.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`acquisition`] | Cache plus fallback chain per capability |
//! | [`adapters`] | Yahoo, Alpha Vantage, Twelve Data, RSS and NewsAPI adapters |
//! | [`analytics`] | Typed analytics snapshots and the lookup table |
//! | [`cache`] | TTL cache, cache modes, clocks |
//! | [`circuit_breaker`] | Per-adapter circuit breaker |
//! | [`config`] | Configuration loading and validation |
//! | [`domain`] | Validated value types |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`fallback`] | Generic ordered fallback chain |
//! | [`http_client`] | HTTP client abstraction |
//! | [`news`] | Relevance filtering, sentiment, de-duplication |
//! | [`projector`] | Score to recommendation projection tables |
//! | [`provider`] | Provider trait and `SourceError` |
//! | [`provider_policy`] | Per-provider quota policies |
//! | [`recommend`] | End-to-end recommendation pipeline |
//! | [`scoring`] | Rule table and scoring engine |
//! | [`source`] | Provider and capability identifiers |
//! | [`synthetic`] | Deterministic terminal values |
//! | [`throttling`] | Non-blocking rate budgets |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketlens_core::{
//!     AcquisitionService, MarketLensConfig, RecommendationService, ReqwestHttpClient, Symbol,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MarketLensConfig::load(None)?;
//!     let acquisition = Arc::new(AcquisitionService::from_config(
//!         &config,
//!         Arc::new(ReqwestHttpClient::new()),
//!     ));
//!     let service = RecommendationService::from_config(&config, acquisition)?;
//!
//!     let recommendation = service.recommend(&Symbol::parse("RELIANCE")?).await?;
//!     println!("{} target {}", recommendation.action, recommendation.target);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ RecommendationService│
//! └──────────┬───────────┘
//!            │ quote
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ AcquisitionService   │────▶│ TtlCache         │
//! └──────────┬───────────┘     └──────────────────┘
//!            │ miss
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ FallbackChain        │────▶│ synthetic source │
//! └──────────┬───────────┘     └──────────────────┘
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ Provider adapters    │────▶│ HTTP client      │
//! └──────────────────────┘     └──────────────────┘
//!
//! quote + AnalyticsSnapshot ──▶ ScoringEngine ──▶ DecisionProjector
//! ```
//!
//! ## Error Handling
//!
//! Acquisition never fails. Provider failures are [`SourceError`]s absorbed by
//! the chain and reported as diagnostics. A malformed analytics snapshot is a
//! hard [`SnapshotError`]:
//!
//! ```rust,ignore
//! match service.recommend(&symbol).await {
//!     Ok(recommendation) => println!("{}", recommendation.reason),
//!     Err(SnapshotError::UnknownSymbol { symbol }) => eprintln!("no analytics for {symbol}"),
//!     Err(other) => return Err(other.into()),
//! }
//! ```
//!
//! ## Security
//!
//! - API keys come from config or environment and are never logged
//! - Request URLs are logged with credentials redacted

pub mod acquisition;
pub mod adapters;
pub mod analytics;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fallback;
pub mod http_client;
pub mod news;
pub mod projector;
pub mod provider;
pub mod provider_policy;
pub mod recommend;
pub mod scoring;
pub mod source;
pub mod synthetic;
pub mod throttling;

// Acquisition
pub use acquisition::{Acquisition, AcquisitionService, NewsPolicy, QuotePolicy};

// Adapter implementations
pub use adapters::{
    AlphaVantageAdapter, NewsApiAdapter, RssFeed, RssFeedAdapter, TwelveDataAdapter, YahooAdapter,
};

// Analytics
pub use analytics::{AnalyticsSnapshot, SnapshotError, SnapshotSource, SnapshotTable};

// Caching
pub use cache::{CacheKey, CacheMode, Clock, ManualClock, SystemClock, TtlCache};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{ApiKeys, ConfigError, MarketLensConfig, MarketLensConfigBuilder};

// Domain models
pub use domain::{
    Action, Confidence, NewsBatch, NewsItem, PercentRange, Quote, QuoteFields, RawNewsEntry,
    Recommendation, RiskLevel, ScoreFactors, Sentiment, Symbol, UtcDateTime,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

// Error types
pub use error::{CoreError, ValidationError};

// Fallback
pub use fallback::{AttemptFailure, ChainPolicy, FallbackChain, Resolved};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// News curation
pub use news::RelevanceFilter;

// Projection
pub use projector::{DecisionProjector, ProjectorError, ProjectorTables};

// Provider contract
pub use provider::{NewsQuery, Provider, SourceError, SourceErrorKind, SourceFuture};

// Provider policies
pub use provider_policy::ProviderPolicy;

// Recommendation pipeline
pub use recommend::{Assessment, RecommendationService};

// Scoring
pub use scoring::{RuleTable, RuleTableError, ScoringEngine};

// Source identifiers
pub use source::{Capability, ProviderId};

// Throttling
pub use throttling::RateBudget;
