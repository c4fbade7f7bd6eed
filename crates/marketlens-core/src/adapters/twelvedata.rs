use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{invalid_json, required_decimal, required_volume, Upstream};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{Provider, SourceError, SourceFuture};
use crate::{ProviderId, QuoteFields, Symbol};

const QUOTE_URL: &str = "https://api.twelvedata.com/quote";

/// Twelve Data `/quote` adapter. Numbers arrive as JSON strings; errors arrive
/// as HTTP 200 with `"status": "error"`.
#[derive(Clone)]
pub struct TwelveDataAdapter {
    upstream: Upstream,
    auth: HttpAuth,
    base_url: String,
    market_suffix: String,
    timeout: Duration,
}

impl TwelveDataAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Twelvedata, http_client),
            auth: HttpAuth::query_key("apikey", api_key),
            base_url: String::from(QUOTE_URL),
            market_suffix: String::from(".NS"),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_market_suffix(mut self, market_suffix: impl Into<String>) -> Self {
        self.market_suffix = market_suffix.into();
        self
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

    pub fn circuit_state(&self) -> CircuitState {
        self.upstream.circuit_state()
    }

    fn request_for(&self, symbol: &Symbol) -> HttpRequest {
        HttpRequest::get(&self.base_url)
            .with_query("symbol", symbol.with_market_suffix(&self.market_suffix))
            .with_auth(&self.auth)
            .with_timeout(self.timeout)
    }
}

impl Provider<Symbol, QuoteFields> for TwelveDataAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Twelvedata
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, QuoteFields> {
        Box::pin(async move {
            self.upstream
                .fetch(self.request_for(symbol), parse_quote)
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    close: Option<String>,
    high: Option<String>,
    low: Option<String>,
    previous_close: Option<String>,
    volume: Option<String>,
    percent_change: Option<String>,
}

fn parse_quote(body: &str) -> Result<QuoteFields, SourceError> {
    const PROVIDER: ProviderId = ProviderId::Twelvedata;

    let response: QuoteResponse =
        serde_json::from_str(body).map_err(|error| invalid_json(PROVIDER, &error))?;

    if response.status.as_deref() == Some("error") {
        let message = format!(
            "twelvedata: {}",
            response.message.as_deref().unwrap_or("unspecified error")
        );
        return Err(match response.code {
            Some(429) => SourceError::rate_limited(message),
            Some(400..=499) => SourceError::invalid_request(message),
            _ => SourceError::unavailable(message),
        });
    }

    let price = required_decimal(PROVIDER, "close", response.close.as_deref())?;
    let high = required_decimal(PROVIDER, "high", response.high.as_deref())?;
    let low = required_decimal(PROVIDER, "low", response.low.as_deref())?;
    let previous_close =
        required_decimal(PROVIDER, "previous_close", response.previous_close.as_deref())?;
    let volume = required_decimal(PROVIDER, "volume", response.volume.as_deref())?;
    let volume = required_volume(PROVIDER, "volume", Some(volume))?;
    let change_percent =
        required_decimal(PROVIDER, "percent_change", response.percent_change.as_deref())?;

    let fields = QuoteFields::new(price, high, low, previous_close, volume, change_percent)?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::provider::SourceErrorKind;

    const QUOTE: &str = r#"{
        "symbol": "INFY",
        "exchange": "NSE",
        "close": "1480.40000",
        "high": "1492.00000",
        "low": "1471.15000",
        "previous_close": "1470.00000",
        "volume": "4200000",
        "change": "10.40000",
        "percent_change": "0.70748"
    }"#;

    fn infy() -> Symbol {
        Symbol::parse("INFY").expect("valid symbol")
    }

    #[tokio::test]
    async fn parses_quote_and_sends_key_as_query() {
        let client = Arc::new(RecordingHttpClient::ok(QUOTE));
        let adapter = TwelveDataAdapter::new(client.clone(), "secret");

        let fields = adapter.fetch(&infy()).await.expect("quote");

        assert_eq!(fields.current_price, 1480.4);
        assert_eq!(fields.previous_close, 1470.0);
        assert_eq!(fields.volume, 4_200_000);

        let request = &client.recorded_requests()[0];
        assert!(request.full_url().contains("symbol=INFY.NS"));
        assert!(request.redacted_url().contains("apikey=%2A%2A%2A"));
    }

    #[tokio::test]
    async fn status_error_body_is_a_failure() {
        let body = r#"{"code":401,"message":"**apikey** parameter is incorrect","status":"error"}"#;
        let adapter = TwelveDataAdapter::new(Arc::new(RecordingHttpClient::ok(body)), "bad");

        let error = adapter.fetch(&infy()).await.expect_err("error body");

        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn missing_previous_close_is_malformed() {
        let body = r#"{"close":"10","high":"11","low":"9","volume":"5","percent_change":"1"}"#;
        let adapter = TwelveDataAdapter::new(Arc::new(RecordingHttpClient::ok(body)), "demo");

        let error = adapter.fetch(&infy()).await.expect_err("malformed");

        assert_eq!(error.kind(), SourceErrorKind::Malformed);
        assert!(error.message().contains("previous_close"));
    }
}
