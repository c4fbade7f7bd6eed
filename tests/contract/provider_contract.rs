//! Contract every upstream adapter honors: a usable payload on a good response,
//! `malformed` on an unusable body and `rate_limited` on HTTP 429.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use marketlens_core::{
    AlphaVantageAdapter, HttpClient, NewsApiAdapter, NewsQuery, Provider, ProviderId, QuoteFields,
    RawNewsEntry, RssFeed, RssFeedAdapter, SourceErrorKind, Symbol, TwelveDataAdapter,
    YahooAdapter,
};

use support::{
    symbol, Route, RoutedHttpClient, ALPHAVANTAGE_GLOBAL_QUOTE, MONEYCONTROL_RSS,
    NEWSAPI_HEADLINES, TWELVEDATA_QUOTE, YAHOO_CHART,
};

type QuoteProvider = Box<dyn Provider<Symbol, QuoteFields>>;
type NewsProvider = Box<dyn Provider<NewsQuery, Vec<RawNewsEntry>>>;

fn client(route: Route) -> Arc<RoutedHttpClient> {
    Arc::new(RoutedHttpClient::new().route("https://", route))
}

fn quote_adapter(id: ProviderId, client: &Arc<RoutedHttpClient>) -> QuoteProvider {
    let http = Arc::clone(client) as Arc<dyn HttpClient>;
    match id {
        ProviderId::Yahoo => Box::new(YahooAdapter::new(http)),
        ProviderId::Alphavantage => Box::new(AlphaVantageAdapter::new(http, "demo")),
        ProviderId::Twelvedata => Box::new(TwelveDataAdapter::new(http, "demo")),
        other => panic!("{other} is not a quote provider"),
    }
}

fn news_adapter(id: ProviderId, client: &Arc<RoutedHttpClient>) -> NewsProvider {
    let http = Arc::clone(client) as Arc<dyn HttpClient>;
    match id {
        ProviderId::Newsapi => Box::new(NewsApiAdapter::new(http, Some(String::from("key-123")))),
        other => Box::new(RssFeedAdapter::new(
            RssFeed::for_provider(other).expect("rss provider"),
            http,
        )),
    }
}

const QUOTE_CASES: [(ProviderId, &str, f64); 3] = [
    (ProviderId::Yahoo, YAHOO_CHART, 2750.0),
    (ProviderId::Alphavantage, ALPHAVANTAGE_GLOBAL_QUOTE, 2751.2),
    (ProviderId::Twelvedata, TWELVEDATA_QUOTE, 2749.8),
];

const NEWS_PROVIDERS: [ProviderId; 4] = [
    ProviderId::Moneycontrol,
    ProviderId::Economictimes,
    ProviderId::Businessstandard,
    ProviderId::Newsapi,
];

#[tokio::test]
async fn quote_adapters_return_valid_fields() {
    for (id, body, price) in QUOTE_CASES {
        let client = client(Route::ok(body));
        let adapter = quote_adapter(id, &client);

        let fields = adapter
            .fetch(&symbol("RELIANCE"))
            .await
            .unwrap_or_else(|error| panic!("{id}: {error}"));

        assert_eq!(adapter.id(), id);
        assert_eq!(fields.current_price, price, "{id}");
        assert!(fields.day_high >= fields.day_low, "{id}");
        assert!(fields.volume > 0, "{id}");
        assert_eq!(fields.previous_close, 2722.75, "{id}");
    }
}

#[tokio::test]
async fn quote_adapters_request_the_exchange_suffixed_ticker() {
    for (id, body, _) in QUOTE_CASES {
        let client = client(Route::ok(body));
        let adapter = quote_adapter(id, &client);

        adapter.fetch(&symbol("TCS")).await.expect("quote");

        let requests = client.requests();
        assert_eq!(requests.len(), 1, "{id} makes exactly one call");
        assert!(requests[0].full_url().contains("TCS.NS"), "{id}");
    }
}

#[tokio::test]
async fn quote_adapters_reject_unusable_bodies_as_malformed() {
    for (id, _, _) in QUOTE_CASES {
        for body in ["not json", "{}", r#"{"unexpected": [1, 2, 3]}"#] {
            let client = client(Route::ok(body));
            let adapter = quote_adapter(id, &client);

            let error = adapter
                .fetch(&symbol("RELIANCE"))
                .await
                .expect_err("unusable body");

            assert_eq!(error.kind(), SourceErrorKind::Malformed, "{id}: {body}");
        }
    }
}

#[tokio::test]
async fn quote_adapters_map_http_429_to_rate_limited() {
    for (id, _, _) in QUOTE_CASES {
        let client = client(Route::status(429));
        let adapter = quote_adapter(id, &client);

        let error = adapter
            .fetch(&symbol("RELIANCE"))
            .await
            .expect_err("throttled");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "{id}");
        assert!(error.retryable(), "{id}");
    }
}

#[tokio::test]
async fn news_adapters_return_entries_with_headline_and_url() {
    for id in NEWS_PROVIDERS {
        let body = if id == ProviderId::Newsapi {
            NEWSAPI_HEADLINES
        } else {
            MONEYCONTROL_RSS
        };
        let client = client(Route::ok(body));
        let adapter = news_adapter(id, &client);

        let entries = adapter
            .fetch(&NewsQuery::market())
            .await
            .unwrap_or_else(|error| panic!("{id}: {error}"));

        assert_eq!(adapter.id(), id);
        assert!(!entries.is_empty(), "{id}");
        for entry in &entries {
            assert!(!entry.headline.is_empty(), "{id}");
            assert!(entry.url.starts_with("https://"), "{id}");
            assert!(entry.published_at.is_some(), "{id}");
        }
    }
}

#[tokio::test]
async fn news_adapters_reject_unusable_bodies_as_malformed() {
    for id in NEWS_PROVIDERS {
        let client = client(Route::ok("<html><body>maintenance</body></html>"));
        let adapter = news_adapter(id, &client);

        let error = adapter
            .fetch(&NewsQuery::market())
            .await
            .expect_err("unusable body");

        assert_eq!(error.kind(), SourceErrorKind::Malformed, "{id}");
    }
}

#[tokio::test]
async fn news_adapters_map_http_429_to_rate_limited() {
    for id in NEWS_PROVIDERS {
        let client = client(Route::status(429));
        let adapter = news_adapter(id, &client);

        let error = adapter
            .fetch(&NewsQuery::market())
            .await
            .expect_err("throttled");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "{id}");
    }
}

#[tokio::test]
async fn newsapi_without_key_fails_before_any_request() {
    let client = client(Route::ok(NEWSAPI_HEADLINES));
    let adapter = NewsApiAdapter::new(Arc::clone(&client) as Arc<dyn HttpClient>, None);

    let error = adapter
        .fetch(&NewsQuery::market())
        .await
        .expect_err("no key");

    assert!(!adapter.has_api_key());
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert!(client.requests().is_empty());
}
