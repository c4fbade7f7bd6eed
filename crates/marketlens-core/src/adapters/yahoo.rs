use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{invalid_json, missing_field, required_volume, Upstream};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{Provider, SourceError, SourceFuture};
use crate::{ProviderId, QuoteFields, Symbol};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart adapter. Reads the `meta` block of the first result;
/// no API key.
#[derive(Clone)]
pub struct YahooAdapter {
    upstream: Upstream,
    base_url: String,
    market_suffix: String,
    timeout: Duration,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Yahoo, http_client),
            base_url: String::from(CHART_URL),
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
        let ticker = symbol.with_market_suffix(&self.market_suffix);
        HttpRequest::get(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&ticker)
        ))
        .with_query("interval", "1d")
        .with_query("range", "1d")
        .with_header("accept", "application/json")
        .with_timeout(self.timeout)
    }
}

impl Provider<Symbol, QuoteFields> for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, QuoteFields> {
        Box::pin(async move {
            self.upstream
                .fetch(self.request_for(symbol), parse_chart)
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
}

fn parse_chart(body: &str) -> Result<QuoteFields, SourceError> {
    const PROVIDER: ProviderId = ProviderId::Yahoo;

    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|error| invalid_json(PROVIDER, &error))?;

    let Some(result) = envelope.chart.result.and_then(|mut results| {
        if results.is_empty() {
            None
        } else {
            Some(results.swap_remove(0))
        }
    }) else {
        let reason = envelope
            .chart
            .error
            .and_then(|error| error.description)
            .unwrap_or_else(|| String::from("empty chart result"));
        return Err(SourceError::malformed(format!("yahoo chart: {reason}")));
    };

    let meta = result.meta;
    let price = meta
        .regular_market_price
        .ok_or_else(|| missing_field(PROVIDER, "regularMarketPrice"))?;
    let day_high = meta
        .regular_market_day_high
        .ok_or_else(|| missing_field(PROVIDER, "regularMarketDayHigh"))?;
    let day_low = meta
        .regular_market_day_low
        .ok_or_else(|| missing_field(PROVIDER, "regularMarketDayLow"))?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .ok_or_else(|| missing_field(PROVIDER, "previousClose"))?;
    let volume = required_volume(PROVIDER, "regularMarketVolume", meta.regular_market_volume)?;

    let fields = QuoteFields::new(
        price,
        day_high,
        day_low,
        previous_close,
        volume,
        QuoteFields::derive_change_percent(price, previous_close),
    )?;
    Ok(fields)
}
