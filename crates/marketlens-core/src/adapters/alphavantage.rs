use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{invalid_json, required_decimal, Upstream};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{Provider, SourceError, SourceFuture};
use crate::{ProviderId, QuoteFields, Symbol};

const QUERY_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage `GLOBAL_QUOTE` adapter.
///
/// The free tier answers over-quota calls with HTTP 200 and a `Note` or
/// `Information` message instead of data; those are reported as rate limits.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    upstream: Upstream,
    auth: HttpAuth,
    base_url: String,
    market_suffix: String,
    timeout: Duration,
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Alphavantage, http_client),
            auth: HttpAuth::query_key("apikey", api_key),
            base_url: String::from(QUERY_URL),
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
            .with_query("function", "GLOBAL_QUOTE")
            .with_query("symbol", symbol.with_market_suffix(&self.market_suffix))
            .with_auth(&self.auth)
            .with_timeout(self.timeout)
    }
}

impl Provider<Symbol, QuoteFields> for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, QuoteFields> {
        Box::pin(async move {
            self.upstream
                .fetch(self.request_for(symbol), parse_global_quote)
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuote>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

fn parse_global_quote(body: &str) -> Result<QuoteFields, SourceError> {
    const PROVIDER: ProviderId = ProviderId::Alphavantage;

    let response: GlobalQuoteResponse =
        serde_json::from_str(body).map_err(|error| invalid_json(PROVIDER, &error))?;

    if let Some(message) = response.note.or(response.information) {
        return Err(SourceError::rate_limited(format!("alphavantage: {message}")));
    }
    if let Some(message) = response.error_message {
        return Err(SourceError::invalid_request(format!("alphavantage: {message}")));
    }

    let quote = response.quote.unwrap_or_default();
    let price = required_decimal(PROVIDER, "05. price", quote.price.as_deref())?;
    let high = required_decimal(PROVIDER, "03. high", quote.high.as_deref())?;
    let low = required_decimal(PROVIDER, "04. low", quote.low.as_deref())?;
    let previous_close =
        required_decimal(PROVIDER, "08. previous close", quote.previous_close.as_deref())?;
    let volume = required_decimal(PROVIDER, "06. volume", quote.volume.as_deref())?;
    let volume = super::required_volume(PROVIDER, "06. volume", Some(volume))?;
    let change_percent =
        required_decimal(PROVIDER, "10. change percent", quote.change_percent.as_deref())?;

    let fields = QuoteFields::new(price, high, low, previous_close, volume, change_percent)?;
    Ok(fields)
}
