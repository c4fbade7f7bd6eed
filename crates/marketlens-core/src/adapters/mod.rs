//! # Provider Adapters
//!
//! One adapter per upstream source. Quote adapters implement
//! `Provider<Symbol, QuoteFields>`; news adapters implement
//! `Provider<NewsQuery, Vec<RawNewsEntry>>`.
//!
//! | Adapter | Capability | Auth | Budget |
//! |---------|------------|------|--------|
//! | [`YahooAdapter`] | quote | none | unthrottled |
//! | [`AlphaVantageAdapter`] | quote | `apikey` query | 5/min |
//! | [`TwelveDataAdapter`] | quote | `apikey` query | 8/min |
//! | [`RssFeedAdapter`] | news | none | unthrottled |
//! | [`NewsApiAdapter`] | news | `X-Api-Key` header | 100/day |
//!
//! Every adapter goes through [`Upstream`], which applies the circuit breaker
//! and rate budget before the call and records the outcome after parsing. A
//! parse failure, a timeout or a call cancelled mid-flight counts against the
//! breaker like a transport failure.

mod alphavantage;
mod newsapi;
mod rss;
mod twelvedata;
mod yahoo;

use std::sync::Arc;

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::SourceError;
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateBudget;
use crate::ProviderId;

pub use alphavantage::AlphaVantageAdapter;
pub use newsapi::NewsApiAdapter;
pub use rss::{parse_rss_items, RssFeed, RssFeedAdapter};
pub use twelvedata::TwelveDataAdapter;
pub use yahoo::YahooAdapter;

/// Guarded access to one provider's HTTP endpoint.
#[derive(Clone)]
pub(crate) struct Upstream {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    budget: Option<RateBudget>,
}

impl Upstream {
    pub(crate) fn new(provider: ProviderId, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            provider,
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::for_provider(provider)),
            budget: ProviderPolicy::default_for(provider)
                .as_ref()
                .map(RateBudget::from_policy),
        }
    }

    pub(crate) fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub(crate) fn with_budget(mut self, budget: Option<RateBudget>) -> Self {
        self.budget = budget;
        self
    }

    pub(crate) fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Perform `request` and parse the body. Exactly one upstream call, no retry.
    pub(crate) async fn fetch<T>(
        &self,
        request: HttpRequest,
        parse: impl FnOnce(&str) -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(format!(
                "{} circuit breaker is open",
                self.provider
            )));
        }

        if let Some(budget) = &self.budget {
            if let Err(wait) = budget.try_acquire() {
                return Err(SourceError::rate_limited(format!(
                    "{} request budget exhausted; next slot in {:.1}s",
                    self.provider,
                    wait.as_secs_f64()
                )));
            }
        }

        tracing::debug!(provider = %self.provider, url = %request.redacted_url(), "upstream request");

        let timeout = request.timeout;
        let in_flight = InFlight::arm(self.provider, &self.circuit_breaker);
        let outcome = tokio::time::timeout(timeout, self.http_client.execute(request)).await;
        in_flight.disarm();

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                self.circuit_breaker.record_failure();
                return Err(SourceError::from_transport(self.provider, &error));
            }
            Err(_) => {
                self.circuit_breaker.record_failure();
                return Err(SourceError::timeout(format!(
                    "{} did not respond within {}ms",
                    self.provider,
                    timeout.as_millis()
                )));
            }
        };

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::from_status(self.provider, response.status));
        }

        match parse(&response.body) {
            Ok(value) => {
                self.circuit_breaker.record_success();
                Ok(value)
            }
            Err(error) => {
                self.circuit_breaker.record_failure();
                Err(error)
            }
        }
    }
}

/// Counts a call abandoned mid-flight, e.g. by the chain deadline, as a
/// breaker failure.
struct InFlight<'a> {
    provider: ProviderId,
    circuit_breaker: &'a CircuitBreaker,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(provider: ProviderId, circuit_breaker: &'a CircuitBreaker) -> Self {
        Self {
            provider,
            circuit_breaker,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(provider = %self.provider, "upstream call cancelled in flight");
            self.circuit_breaker.record_failure();
        }
    }
}

/// Required numeric field encoded as a JSON string, e.g. `"05. price": "2750.10"`.
pub(crate) fn required_decimal(
    provider: ProviderId,
    field: &str,
    value: Option<&str>,
) -> Result<f64, SourceError> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| missing_field(provider, field))?;
    let parsed = raw
        .trim_end_matches('%')
        .parse::<f64>()
        .map_err(|_| SourceError::malformed(format!("{provider} field '{field}' is not numeric: '{raw}'")))?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(SourceError::malformed(format!("{provider} field '{field}' is not finite")))
    }
}

/// Required non-negative integer volume; tolerates integral decimals like `"1200.0"`.
pub(crate) fn required_volume(
    provider: ProviderId,
    field: &str,
    value: Option<f64>,
) -> Result<u64, SourceError> {
    let volume = value.ok_or_else(|| missing_field(provider, field))?;
    if !volume.is_finite() || volume < 0.0 || volume.fract() != 0.0 {
        return Err(SourceError::malformed(format!(
            "{provider} field '{field}' is not a non-negative integer: {volume}"
        )));
    }
    Ok(volume as u64)
}

pub(crate) fn missing_field(provider: ProviderId, field: &str) -> SourceError {
    SourceError::malformed(format!("{provider} response missing '{field}'"))
}

pub(crate) fn invalid_json(provider: ProviderId, error: &serde_json::Error) -> SourceError {
    SourceError::malformed(format!("{provider} response is not valid JSON: {error}"))
}
