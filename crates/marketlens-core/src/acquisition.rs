//! # Acquisition Service
//!
//! The only entry point application code uses to obtain quotes and news.
//! Each call checks the capability's [`TtlCache`], resolves through the
//! [`FallbackChain`] on a miss, and caches whatever the chain returned,
//! synthetic values included. Acquisition never fails.
//!
//! | Call | Returns |
//! |------|---------|
//! | [`AcquisitionService::get_quote`] | [`Quote`] |
//! | [`AcquisitionService::get_quotes`] | one [`Quote`] per symbol, resolved concurrently |
//! | [`AcquisitionService::get_news`] | curated [`NewsItem`]s |
//! | [`AcquisitionService::acquire_quote`] / [`AcquisitionService::acquire_news`] | value plus [`Acquisition`] diagnostics |

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::adapters::{
    AlphaVantageAdapter, NewsApiAdapter, RssFeed, RssFeedAdapter, TwelveDataAdapter, YahooAdapter,
};
use crate::cache::{CacheKey, CacheMode, Clock, TtlCache};
use crate::config::MarketLensConfig;
use crate::fallback::{AttemptFailure, ChainPolicy, FallbackChain};
use crate::http_client::HttpClient;
use crate::news::{self, RelevanceFilter};
use crate::provider::{NewsQuery, Provider, SourceError};
use crate::{
    synthetic, NewsBatch, NewsItem, ProviderId, Quote, QuoteFields, RawNewsEntry, Symbol,
    UtcDateTime,
};

type QuoteProvider = Arc<dyn Provider<Symbol, QuoteFields>>;
type NewsProvider = Arc<dyn Provider<NewsQuery, Vec<RawNewsEntry>>>;

/// Provenance every cached value carries.
pub trait Provenance {
    fn source(&self) -> ProviderId;
    fn is_synthetic(&self) -> bool;
}

impl Provenance for Quote {
    fn source(&self) -> ProviderId {
        self.source
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

impl Provenance for NewsBatch {
    fn source(&self) -> ProviderId {
        self.provider
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// Quote chain: payloads are re-validated, then stamped with provenance.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotePolicy;

impl ChainPolicy for QuotePolicy {
    type Request = Symbol;
    type Raw = QuoteFields;
    type Output = Quote;

    fn accept(
        &self,
        symbol: &Symbol,
        provider: ProviderId,
        raw: QuoteFields,
    ) -> Result<Quote, SourceError> {
        let fields = QuoteFields::new(
            raw.current_price,
            raw.day_high,
            raw.day_low,
            raw.previous_close,
            raw.volume,
            raw.change_percent,
        )?;
        Ok(Quote::from_fields(
            symbol.clone(),
            fields,
            provider,
            false,
            UtcDateTime::now(),
        ))
    }

    fn synthesize(&self, symbol: &Symbol) -> Quote {
        synthetic::quote(symbol, UtcDateTime::now())
    }

    fn describe(&self, symbol: &Symbol) -> String {
        symbol.to_string()
    }
}

/// News chain: each provider's batch is curated; an empty result is unusable.
#[derive(Debug, Clone, Default)]
pub struct NewsPolicy {
    filter: RelevanceFilter,
}

impl NewsPolicy {
    pub fn new(filter: RelevanceFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &RelevanceFilter {
        &self.filter
    }
}

impl ChainPolicy for NewsPolicy {
    type Request = NewsQuery;
    type Raw = Vec<RawNewsEntry>;
    type Output = NewsBatch;

    fn accept(
        &self,
        query: &NewsQuery,
        provider: ProviderId,
        raw: Vec<RawNewsEntry>,
    ) -> Result<NewsBatch, SourceError> {
        let fetched_at = UtcDateTime::now();
        let received = raw.len();
        let items = news::curate(&self.filter, query, provider, raw, fetched_at);
        if items.is_empty() {
            return Err(SourceError::malformed(format!(
                "{provider} returned no relevant items ({received} received)"
            )));
        }
        Ok(NewsBatch {
            topic: query.topic.clone(),
            items,
            provider,
            synthetic: false,
            fetched_at,
        })
    }

    fn synthesize(&self, query: &NewsQuery) -> NewsBatch {
        synthetic::news(&query.topic, UtcDateTime::now())
    }

    fn describe(&self, query: &NewsQuery) -> String {
        format!("news:{}", query.topic)
    }
}

/// A value plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Acquisition<T> {
    pub value: T,
    pub cache_hit: bool,
    /// Age of the cached entry on a hit.
    pub cache_age: Option<Duration>,
    pub source: ProviderId,
    pub synthetic: bool,
    /// Providers invoked in order; on a hit, just the cached value's source.
    pub source_chain: Vec<ProviderId>,
    pub attempts: Vec<AttemptFailure>,
    pub latency_ms: u64,
}

pub struct AcquisitionService {
    quotes: FallbackChain<QuotePolicy>,
    news: FallbackChain<NewsPolicy>,
    quote_cache: TtlCache<CacheKey, Quote>,
    news_cache: TtlCache<CacheKey, NewsBatch>,
    deadline: Option<Duration>,
}

impl AcquisitionService {
    pub fn new(
        quotes: FallbackChain<QuotePolicy>,
        news: FallbackChain<NewsPolicy>,
        quote_ttl: Duration,
        news_ttl: Duration,
    ) -> Self {
        Self {
            quotes,
            news,
            quote_cache: TtlCache::new(quote_ttl),
            news_cache: TtlCache::new(news_ttl),
            deadline: None,
        }
    }

    /// Build adapters for the configured provider orders over `http_client`.
    pub fn from_config(config: &MarketLensConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let quote_providers = config
            .quote_providers
            .iter()
            .filter_map(|provider| quote_adapter(config, *provider, &http_client))
            .collect();
        let news_providers = config
            .news_providers
            .iter()
            .filter_map(|provider| news_adapter(config, *provider, &http_client))
            .collect();

        Self::assemble(config, quote_providers, news_providers)
    }

    /// No upstream providers: every miss resolves to the synthetic source.
    pub fn offline(config: &MarketLensConfig) -> Self {
        Self::assemble(config, Vec::new(), Vec::new())
    }

    fn assemble(
        config: &MarketLensConfig,
        quote_providers: Vec<QuoteProvider>,
        news_providers: Vec<NewsProvider>,
    ) -> Self {
        let quotes = FallbackChain::new(QuotePolicy, quote_providers, config.provider_timeout)
            .with_timeout_overrides(config.provider_timeouts.clone());
        let news = FallbackChain::new(
            NewsPolicy::new(config.relevance.clone()),
            news_providers,
            config.provider_timeout,
        )
        .with_timeout_overrides(config.provider_timeouts.clone());

        Self::new(quotes, news, config.quote_ttl, config.news_ttl)
            .with_deadline(Some(config.request_deadline))
    }

    /// Freshness is judged against `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.quote_cache = TtlCache::with_clock(self.quote_cache.ttl(), Arc::clone(&clock));
        self.news_cache = TtlCache::with_clock(self.news_cache.ttl(), clock);
        self
    }

    /// Total time budget for one resolution across all attempts.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn quote_providers(&self) -> Vec<ProviderId> {
        self.quotes.provider_ids()
    }

    pub fn news_providers(&self) -> Vec<ProviderId> {
        self.news.provider_ids()
    }

    pub fn quote_ttl(&self) -> Duration {
        self.quote_cache.ttl()
    }

    pub fn news_ttl(&self) -> Duration {
        self.news_cache.ttl()
    }

    pub async fn get_quote(&self, symbol: &Symbol) -> Quote {
        self.acquire_quote(symbol, CacheMode::Use).await.value
    }

    pub async fn get_quotes(&self, symbols: &[Symbol]) -> Vec<Quote> {
        self.acquire_quotes(symbols, CacheMode::Use)
            .await
            .into_iter()
            .map(|acquired| acquired.value)
            .collect()
    }

    pub async fn get_news(&self, query: &NewsQuery) -> Vec<NewsItem> {
        self.acquire_news(query, CacheMode::Use).await.value.items
    }

    pub async fn acquire_quote(&self, symbol: &Symbol, mode: CacheMode) -> Acquisition<Quote> {
        acquire(
            &self.quotes,
            &self.quote_cache,
            CacheKey::quote(symbol.as_str()),
            symbol,
            mode,
            self.deadline,
        )
        .await
    }

    /// One concurrent resolution per symbol; output order follows input order.
    pub async fn acquire_quotes(
        &self,
        symbols: &[Symbol],
        mode: CacheMode,
    ) -> Vec<Acquisition<Quote>> {
        join_all(symbols.iter().map(|symbol| self.acquire_quote(symbol, mode))).await
    }

    pub async fn acquire_news(&self, query: &NewsQuery, mode: CacheMode) -> Acquisition<NewsBatch> {
        acquire(
            &self.news,
            &self.news_cache,
            CacheKey::news(&query.topic),
            query,
            mode,
            self.deadline,
        )
        .await
    }
}

async fn acquire<P>(
    chain: &FallbackChain<P>,
    cache: &TtlCache<CacheKey, P::Output>,
    key: CacheKey,
    request: &P::Request,
    mode: CacheMode,
    deadline: Option<Duration>,
) -> Acquisition<P::Output>
where
    P: ChainPolicy,
    P::Output: Provenance + Clone,
{
    let started = Instant::now();

    if mode.reads() {
        if let Some((value, age)) = cache.get_with_age(&key) {
            tracing::debug!(
                key = %key,
                age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX),
                "cache hit"
            );
            let source = value.source();
            return Acquisition {
                synthetic: value.is_synthetic(),
                value,
                cache_hit: true,
                cache_age: Some(age),
                source,
                source_chain: vec![source],
                attempts: Vec::new(),
                latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
        }
        tracing::debug!(key = %key, "cache miss");
    }

    let resolved = chain.resolve(request, deadline).await;
    if mode.writes() {
        cache.put(key, resolved.value.clone());
    }

    Acquisition {
        value: resolved.value,
        cache_hit: false,
        cache_age: None,
        source: resolved.source,
        synthetic: resolved.synthetic,
        source_chain: resolved.source_chain,
        attempts: resolved.attempts,
        latency_ms: resolved.latency_ms,
    }
}

fn quote_adapter(
    config: &MarketLensConfig,
    provider: ProviderId,
    http_client: &Arc<dyn HttpClient>,
) -> Option<QuoteProvider> {
    let client = Arc::clone(http_client);
    let timeout = config.timeout_for(provider);
    let suffix = config.market_suffix.as_str();
    let adapter: QuoteProvider = match provider {
        ProviderId::Yahoo => Arc::new(
            YahooAdapter::new(client)
                .with_market_suffix(suffix)
                .with_timeout(timeout),
        ),
        ProviderId::Alphavantage => Arc::new(
            AlphaVantageAdapter::new(client, config.api_keys.alphavantage.clone())
                .with_market_suffix(suffix)
                .with_timeout(timeout),
        ),
        ProviderId::Twelvedata => Arc::new(
            TwelveDataAdapter::new(client, config.api_keys.twelvedata.clone())
                .with_market_suffix(suffix)
                .with_timeout(timeout),
        ),
        _ => return None,
    };
    Some(adapter)
}

fn news_adapter(
    config: &MarketLensConfig,
    provider: ProviderId,
    http_client: &Arc<dyn HttpClient>,
) -> Option<NewsProvider> {
    let client = Arc::clone(http_client);
    let timeout = config.timeout_for(provider);
    if provider == ProviderId::Newsapi {
        return Some(Arc::new(
            NewsApiAdapter::new(client, config.api_keys.newsapi.clone()).with_timeout(timeout),
        ));
    }
    RssFeed::for_provider(provider)
        .map(|feed| Arc::new(RssFeedAdapter::new(feed, client).with_timeout(timeout)) as NewsProvider)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::ManualClock;
    use crate::provider::SourceFuture;

    struct CountingQuotes {
        id: ProviderId,
        fields: Option<QuoteFields>,
        calls: AtomicUsize,
    }

    impl CountingQuotes {
        fn ok(id: ProviderId, price: f64) -> Arc<Self> {
            Arc::new(Self {
                id,
                fields: Some(QuoteFields {
                    current_price: price,
                    day_high: price + 10.0,
                    day_low: price - 10.0,
                    previous_close: price,
                    volume: 1_000,
                    change_percent: 0.0,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: ProviderId) -> Arc<Self> {
            Arc::new(Self {
                id,
                fields: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Provider<Symbol, QuoteFields> for CountingQuotes {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn fetch<'a>(&'a self, _symbol: &'a Symbol) -> SourceFuture<'a, QuoteFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                self.fields
                    .ok_or_else(|| SourceError::unavailable("scripted outage"))
            })
        }
    }

    struct StaticNews {
        id: ProviderId,
        headlines: Vec<&'static str>,
    }

    impl Provider<NewsQuery, Vec<RawNewsEntry>> for StaticNews {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn fetch<'a>(&'a self, _query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawNewsEntry>> {
            Box::pin(async move {
                Ok(self
                    .headlines
                    .iter()
                    .enumerate()
                    .map(|(n, headline)| RawNewsEntry::new(*headline, format!("https://n.test/{n}")))
                    .collect())
            })
        }
    }

    fn service(
        quotes: Vec<Arc<CountingQuotes>>,
        news: Vec<Arc<StaticNews>>,
        clock: Arc<ManualClock>,
    ) -> AcquisitionService {
        let quotes = quotes.into_iter().map(|p| p as QuoteProvider).collect();
        let news = news.into_iter().map(|p| p as NewsProvider).collect();
        AcquisitionService::new(
            FallbackChain::new(QuotePolicy, quotes, Duration::from_secs(1)),
            FallbackChain::new(NewsPolicy::default(), news, Duration::from_secs(1)),
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
        .with_clock(clock)
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[tokio::test]
    async fn cached_quote_is_returned_until_ttl_expires() {
        let clock = Arc::new(ManualClock::new());
        let provider = CountingQuotes::ok(ProviderId::Yahoo, 100.0);
        let service = service(vec![provider.clone()], Vec::new(), clock.clone());

        let first = service.get_quote(&symbol("TCS")).await;
        clock.advance(Duration::from_secs(59));
        let second = service.acquire_quote(&symbol("TCS"), CacheMode::Use).await;

        assert_eq!(first, second.value);
        assert!(second.cache_hit);
        assert_eq!(provider.calls(), 1);

        clock.advance(Duration::from_secs(1));
        let third = service.acquire_quote(&symbol("TCS"), CacheMode::Use).await;
        assert!(!third.cache_hit);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn synthetic_results_are_cached_too() {
        let clock = Arc::new(ManualClock::new());
        let provider = CountingQuotes::failing(ProviderId::Yahoo);
        let service = service(vec![provider.clone()], Vec::new(), clock);

        let first = service.acquire_quote(&symbol("INFY"), CacheMode::Use).await;
        let second = service.acquire_quote(&symbol("INFY"), CacheMode::Use).await;

        assert!(first.synthetic);
        assert_eq!(first.source, ProviderId::Fallback);
        assert!(second.cache_hit);
        assert!(second.synthetic);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_skips_read_and_bypass_skips_write() {
        let clock = Arc::new(ManualClock::new());
        let provider = CountingQuotes::ok(ProviderId::Yahoo, 100.0);
        let service = service(vec![provider.clone()], Vec::new(), clock);
        let tcs = symbol("TCS");

        service.acquire_quote(&tcs, CacheMode::Bypass).await;
        let after_bypass = service.acquire_quote(&tcs, CacheMode::Use).await;
        assert!(!after_bypass.cache_hit, "bypass must not populate the cache");

        let refreshed = service.acquire_quote(&tcs, CacheMode::Refresh).await;
        assert!(!refreshed.cache_hit);
        assert_eq!(provider.calls(), 3);

        assert!(service.acquire_quote(&tcs, CacheMode::Use).await.cache_hit);
    }

    #[tokio::test]
    async fn get_quotes_keeps_input_order() {
        let clock = Arc::new(ManualClock::new());
        let service = service(
            vec![CountingQuotes::ok(ProviderId::Yahoo, 250.0)],
            Vec::new(),
            clock,
        );
        let symbols = [symbol("TCS"), symbol("INFY"), symbol("ITC")];

        let quotes = service.get_quotes(&symbols).await;

        let tickers: Vec<&str> = quotes.iter().map(|quote| quote.symbol.as_str()).collect();
        assert_eq!(tickers, vec!["TCS", "INFY", "ITC"]);
    }

    #[tokio::test]
    async fn irrelevant_news_batch_moves_to_next_provider() {
        let clock = Arc::new(ManualClock::new());
        let service = service(
            Vec::new(),
            vec![
                Arc::new(StaticNews {
                    id: ProviderId::Moneycontrol,
                    headlines: vec!["Monsoon arrives early"],
                }),
                Arc::new(StaticNews {
                    id: ProviderId::Economictimes,
                    headlines: vec!["Sensex gains 200 points", "Sensex gains 200 points"],
                }),
            ],
            clock,
        );

        let acquired = service.acquire_news(&NewsQuery::market(), CacheMode::Use).await;

        assert_eq!(acquired.source, ProviderId::Economictimes);
        assert_eq!(acquired.value.items.len(), 1);
        assert_eq!(
            acquired.source_chain,
            vec![ProviderId::Moneycontrol, ProviderId::Economictimes]
        );
    }

    #[tokio::test]
    async fn offline_service_is_synthetic_only() {
        let service = AcquisitionService::offline(&MarketLensConfig::default());

        let acquired = service.acquire_quote(&symbol("RELIANCE"), CacheMode::Use).await;
        let news = service.get_news(&NewsQuery::market()).await;

        assert!(acquired.synthetic);
        assert_eq!(acquired.source_chain, vec![ProviderId::Fallback]);
        assert_eq!(news.len(), 5);
        assert!(service.quote_providers().is_empty());
    }

    #[test]
    fn from_config_follows_configured_order() {
        let config = MarketLensConfig::builder()
            .quote_providers([ProviderId::Twelvedata, ProviderId::Yahoo])
            .build()
            .expect("valid config");

        let service =
            AcquisitionService::from_config(&config, Arc::new(crate::http_client::NoopHttpClient));

        assert_eq!(
            service.quote_providers(),
            vec![ProviderId::Twelvedata, ProviderId::Yahoo]
        );
        assert_eq!(service.news_providers().len(), 4);
        assert_eq!(service.deadline(), Some(Duration::from_secs(12)));
    }
}
