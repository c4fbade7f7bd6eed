use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{invalid_json, Upstream};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{NewsQuery, Provider, SourceError, SourceFuture};
use crate::{ProviderId, RawNewsEntry, UtcDateTime};

const TOP_HEADLINES_URL: &str = "https://newsapi.org/v2/top-headlines";

/// NewsAPI top business headlines for India. Requires an API key; without one
/// every call fails with `source.invalid_request` before touching the network.
#[derive(Clone)]
pub struct NewsApiAdapter {
    upstream: Upstream,
    auth: Option<HttpAuth>,
    base_url: String,
    page_size: u32,
    timeout: Duration,
}

impl NewsApiAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Newsapi, http_client),
            auth: api_key
                .filter(|key| !key.trim().is_empty())
                .map(|key| HttpAuth::header("X-Api-Key", key)),
            base_url: String::from(TOP_HEADLINES_URL),
            page_size: 20,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.upstream = self.upstream.with_circuit_breaker(circuit_breaker);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.auth.is_some()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.upstream.circuit_state()
    }
}

impl Provider<NewsQuery, Vec<RawNewsEntry>> for NewsApiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Newsapi
    }

    fn fetch<'a>(&'a self, _query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawNewsEntry>> {
        Box::pin(async move {
            let Some(auth) = &self.auth else {
                return Err(SourceError::invalid_request("newsapi api key is not configured"));
            };

            let request = HttpRequest::get(&self.base_url)
                .with_query("country", "in")
                .with_query("category", "business")
                .with_query("pageSize", self.page_size.to_string())
                .with_auth(auth)
                .with_timeout(self.timeout);

            self.upstream.fetch(request, parse_headlines).await
        })
    }
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

fn parse_headlines(body: &str) -> Result<Vec<RawNewsEntry>, SourceError> {
    let response: HeadlinesResponse =
        serde_json::from_str(body).map_err(|error| invalid_json(ProviderId::Newsapi, &error))?;

    if response.status.as_deref() == Some("error") {
        let code = response.code.unwrap_or_default();
        let message = format!(
            "newsapi {code}: {}",
            response.message.unwrap_or_else(|| String::from("unspecified error"))
        );
        return Err(if code == "rateLimited" {
            SourceError::rate_limited(message)
        } else {
            SourceError::invalid_request(message)
        });
    }

    let articles = response
        .articles
        .ok_or_else(|| super::missing_field(ProviderId::Newsapi, "articles"))?;

    Ok(articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title.filter(|title| !title.trim().is_empty())?;
            let url = article.url.filter(|url| !url.trim().is_empty())?;
            let mut entry = RawNewsEntry::new(title.trim(), url.trim()).with_publisher(
                article
                    .source
                    .and_then(|source| source.name)
                    .unwrap_or_else(|| String::from(ProviderId::Newsapi.display_name())),
            );
            if let Some(published_at) = article
                .published_at
                .as_deref()
                .and_then(UtcDateTime::parse_feed)
            {
                entry = entry.with_published_at(published_at);
            }
            Some(entry)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::provider::SourceErrorKind;

    const HEADLINES: &str = r#"{
        "status": "ok",
        "totalResults": 2,
        "articles": [
            {
                "source": {"id": null, "name": "Livemint"},
                "title": "Nifty hits record high as banks rally",
                "url": "https://example.test/nifty",
                "publishedAt": "2024-05-10T06:30:00Z"
            },
            {
                "source": {"id": null, "name": "Reuters"},
                "title": null,
                "url": "https://example.test/untitled",
                "publishedAt": "2024-05-10T05:00:00Z"
            }
        ]
    }"#;

    #[tokio::test]
    async fn sends_key_header_and_maps_articles() {
        let client = Arc::new(RecordingHttpClient::ok(HEADLINES));
        let adapter = NewsApiAdapter::new(client.clone(), Some(String::from("key-123")));

        let entries = adapter.fetch(&NewsQuery::market()).await.expect("headlines");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].headline, "Nifty hits record high as banks rally");
        assert_eq!(entries[0].publisher.as_deref(), Some("Livemint"));
        assert!(entries[0].published_at.is_some());

        let request = &client.recorded_requests()[0];
        assert_eq!(
            request.headers.get("x-api-key").map(String::as_str),
            Some("key-123")
        );
        assert!(!request.full_url().contains("key-123"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let client = Arc::new(RecordingHttpClient::ok(HEADLINES));
        let adapter = NewsApiAdapter::new(client.clone(), None);

        let error = adapter
            .fetch(&NewsQuery::market())
            .await
            .expect_err("no key");

        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn rate_limited_body_is_classified() {
        let body = r#"{"status":"error","code":"rateLimited","message":"You have made too many requests recently."}"#;
        let adapter =
            NewsApiAdapter::new(Arc::new(RecordingHttpClient::ok(body)), Some(String::from("k")));

        let error = adapter
            .fetch(&NewsQuery::market())
            .await
            .expect_err("rate limited");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    }
}
