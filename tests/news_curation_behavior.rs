//! Behavior-driven tests for news curation, through the acquisition chain and
//! on the pure curation functions.

mod support;

use std::sync::Arc;

use marketlens_core::news::{classify_sentiment, curate, dedupe, normalize_headline};
use marketlens_core::{
    AcquisitionService, ApiKeys, CacheMode, HttpClient, MarketLensConfig, NewsQuery, ProviderId,
    RawNewsEntry, RelevanceFilter, Sentiment, SourceErrorKind, UtcDateTime,
};

use support::{
    Route, RoutedHttpClient, ECONOMICTIMES_HOST, MONEYCONTROL_HOST, NEWSAPI_HEADLINES,
    NEWSAPI_HOST,
};

const IRRELEVANT_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><title>Monsoon forecast revised upward</title><link>https://www.moneycontrol.com/a.html</link></item>
  <item><title>Cricket team announced for tour</title><link>https://www.moneycontrol.com/b.html</link></item>
</channel></rss>"#;

const ECONOMICTIMES_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title><![CDATA[Infosys shares rise on strong deal wins]]></title>
    <link>https://economictimes.indiatimes.com/markets/infy-1.cms</link>
    <pubDate>Fri, 10 May 2024 11:00:00 +0530</pubDate>
  </item>
  <item>
    <title>Infosys  shares rise on strong deal wins</title>
    <link>https://economictimes.indiatimes.com/markets/infy-2.cms</link>
    <pubDate>Fri, 10 May 2024 11:05:00 +0530</pubDate>
  </item>
</channel></rss>"#;

fn at(raw: &str) -> UtcDateTime {
    UtcDateTime::parse(raw).expect("valid timestamp")
}

#[tokio::test]
async fn when_feed_has_no_relevant_items_system_moves_to_next_feed() {
    // Given: Moneycontrol publishes only off-topic headlines
    let client = Arc::new(
        RoutedHttpClient::new()
            .route(MONEYCONTROL_HOST, Route::ok(IRRELEVANT_RSS))
            .route(ECONOMICTIMES_HOST, Route::ok(ECONOMICTIMES_RSS)),
    );
    let service = AcquisitionService::from_config(
        &MarketLensConfig::default(),
        Arc::clone(&client) as Arc<dyn HttpClient>,
    );

    // When: market news is requested
    let acquired = service
        .acquire_news(&NewsQuery::market(), CacheMode::Use)
        .await;

    // Then: the empty Moneycontrol batch is rejected and Economic Times serves
    assert_eq!(acquired.source, ProviderId::Economictimes);
    assert_eq!(
        acquired.source_chain,
        vec![ProviderId::Moneycontrol, ProviderId::Economictimes]
    );
    assert_eq!(acquired.attempts.len(), 1);
    assert_eq!(acquired.attempts[0].error.kind(), SourceErrorKind::Malformed);

    // Then: whitespace-variant duplicates collapse to the first seen
    let items = &acquired.value.items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].headline, "Infosys shares rise on strong deal wins");
    assert_eq!(items[0].sentiment, Sentiment::Positive);
    assert_eq!(items[0].source, "Economic Times");
    assert_eq!(items[0].id, "economictimes-1");
}

#[tokio::test]
async fn when_aggregator_serves_news_system_keeps_publisher_labels() {
    // Given: only NewsAPI is configured, with a key
    let client = Arc::new(RoutedHttpClient::new().route(NEWSAPI_HOST, Route::ok(NEWSAPI_HEADLINES)));
    let config = MarketLensConfig::builder()
        .news_providers(vec![ProviderId::Newsapi])
        .api_keys(ApiKeys {
            newsapi: Some(String::from("key-123")),
            ..ApiKeys::default()
        })
        .build()
        .expect("valid configuration");
    let service = AcquisitionService::from_config(&config, Arc::clone(&client) as Arc<dyn HttpClient>);

    // When: market news is requested
    let acquired = service
        .acquire_news(&NewsQuery::market(), CacheMode::Use)
        .await;

    // Then: the off-topic headline is dropped and the article publisher is kept
    let items = &acquired.value.items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].headline, "Nifty hits record high on FII buying");
    assert_eq!(items[0].source, "Mint");
    assert_eq!(items[0].symbol, "NIFTY50");
    assert_eq!(items[0].provider, ProviderId::Newsapi);
    assert_eq!(items[0].published_at, at("2024-05-10T04:30:00Z"));
}

#[tokio::test]
async fn when_topic_is_a_symbol_system_treats_it_as_a_relevance_term() {
    // Given: a filter with no keywords of its own and a Wipro story in the feed
    let feed = r#"<rss><channel>
      <item><title>Wipro wins large cloud contract</title><link>https://www.moneycontrol.com/w.html</link></item>
      <item><title>Gold prices ease</title><link>https://www.moneycontrol.com/g.html</link></item>
    </channel></rss>"#;
    let client = Arc::new(RoutedHttpClient::new().route(MONEYCONTROL_HOST, Route::ok(feed)));
    let config = MarketLensConfig::builder()
        .relevance(RelevanceFilter {
            keywords: Vec::new(),
            tracked_symbols: Vec::new(),
            max_items: 7,
        })
        .build()
        .expect("valid configuration");
    let service = AcquisitionService::from_config(&config, Arc::clone(&client) as Arc<dyn HttpClient>);

    // When: news for WIPRO is requested
    let acquired = service
        .acquire_news(&NewsQuery::new("WIPRO"), CacheMode::Use)
        .await;

    // Then: the symbol itself makes the Wipro headline relevant
    assert_eq!(acquired.value.topic, "wipro");
    assert_eq!(acquired.value.items.len(), 1);
    assert_eq!(acquired.value.items[0].headline, "Wipro wins large cloud contract");
    assert_eq!(acquired.value.items[0].sentiment, Sentiment::Positive);
}

#[test]
fn when_headlines_differ_only_in_case_and_spacing_system_keeps_the_first() {
    let fetched_at = at("2024-05-10T08:00:00Z");
    let entries = vec![
        RawNewsEntry::new("Nifty closes at record", "https://a.test/1")
            .with_published_at(at("2024-05-10T06:00:00Z")),
        RawNewsEntry::new("  NIFTY closes   at RECORD ", "https://b.test/2")
            .with_published_at(at("2024-05-10T07:00:00Z")),
    ];

    let items = curate(
        &RelevanceFilter::default(),
        &NewsQuery::market(),
        ProviderId::Businessstandard,
        entries,
        fetched_at,
    );

    assert_eq!(
        normalize_headline("  NIFTY closes   at RECORD "),
        "nifty closes at record"
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "https://a.test/1");
    assert_eq!(dedupe(items.clone()), items);
}

#[test]
fn when_entry_has_no_timestamp_system_uses_fetch_time() {
    let fetched_at = at("2024-05-10T08:00:00Z");

    let items = curate(
        &RelevanceFilter::default(),
        &NewsQuery::market(),
        ProviderId::Moneycontrol,
        vec![RawNewsEntry::new("Stock market opens flat", "https://a.test/1")],
        fetched_at,
    );

    assert_eq!(items[0].published_at, fetched_at);
    assert_eq!(items[0].source, "MoneyControl");
    assert_eq!(items[0].symbol, "MARKET");
}

#[test]
fn when_filter_caps_batch_system_keeps_newest_items() {
    let filter = RelevanceFilter {
        max_items: 2,
        ..RelevanceFilter::default()
    };
    let entries = ["05", "07", "06"]
        .into_iter()
        .map(|hour| {
            RawNewsEntry::new(format!("Sensex update at {hour}"), format!("https://a.test/{hour}"))
                .with_published_at(at(&format!("2024-05-10T{hour}:00:00Z")))
        })
        .collect();

    let items = curate(
        &filter,
        &NewsQuery::market(),
        ProviderId::Moneycontrol,
        entries,
        at("2024-05-10T08:00:00Z"),
    );

    let headlines: Vec<&str> = items.iter().map(|item| item.headline.as_str()).collect();
    assert_eq!(headlines, vec!["Sensex update at 07", "Sensex update at 06"]);
}

#[test]
fn when_headline_votes_are_mixed_system_classifies_by_majority() {
    let cases = [
        ("Banks gain as credit growth stays strong", Sentiment::Positive),
        ("Metals decline on weak China data", Sentiment::Negative),
        ("Pharma stocks rise while IT posts loss", Sentiment::Neutral),
        ("Upbeat outlook for highways", Sentiment::Neutral),
    ];

    for (headline, expected) in cases {
        assert_eq!(classify_sentiment(headline), expected, "{headline}");
    }
}
