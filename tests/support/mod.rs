//! Shared test doubles and fixtures for the behavior suites.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use marketlens_core::analytics::{
    BollingerPosition, EarningsIntelligence, LiquidityMetrics, MarketContext, MarketRegime,
    OptionsAnalysis, OptionsFlow, RiskMetrics, RotationStance, TechnicalIndicators, VwapSignal,
};
use marketlens_core::http_client::HttpFuture;
use marketlens_core::{
    AnalyticsSnapshot, HttpClient, HttpError, HttpRequest, HttpResponse, ProviderId, Quote,
    QuoteFields, Symbol, UtcDateTime,
};

/// What a routed host does when called.
#[derive(Debug, Clone)]
pub enum Route {
    Respond { status: u16, body: String },
    Hang(Duration),
    Fail(HttpError),
}

impl Route {
    pub fn ok(body: &str) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_owned(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Respond {
            status,
            body: String::new(),
        }
    }
}

/// Transport that answers by URL substring and records every request.
/// Unrouted URLs fail to connect.
#[derive(Debug, Default)]
pub struct RoutedHttpClient {
    routes: Vec<(String, Route)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, needle: &str, route: Route) -> Self {
        self.routes.push((needle.to_owned(), route));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log").clone()
    }

    pub fn calls_to(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(needle))
            .count()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let route = self
            .routes
            .iter()
            .find(|(needle, _)| request.url.contains(needle.as_str()))
            .map(|(_, route)| route.clone());
        self.requests.lock().expect("request log").push(request);

        Box::pin(async move {
            match route {
                Some(Route::Respond { status, body }) => Ok(HttpResponse::with_status(status, body)),
                Some(Route::Hang(duration)) => {
                    tokio::time::sleep(duration).await;
                    Ok(HttpResponse::ok(""))
                }
                Some(Route::Fail(error)) => Err(error),
                None => Err(HttpError::connect("no route to host")),
            }
        })
    }
}

pub const YAHOO_HOST: &str = "finance.yahoo.com";
pub const ALPHAVANTAGE_HOST: &str = "alphavantage.co";
pub const TWELVEDATA_HOST: &str = "twelvedata.com";
pub const MONEYCONTROL_HOST: &str = "moneycontrol.com";
pub const ECONOMICTIMES_HOST: &str = "indiatimes.com";
pub const BUSINESSSTANDARD_HOST: &str = "business-standard.com";
pub const NEWSAPI_HOST: &str = "newsapi.org";

pub const YAHOO_CHART: &str = r#"{
    "chart": {
        "result": [{
            "meta": {
                "currency": "INR",
                "regularMarketPrice": 2750.0,
                "regularMarketDayHigh": 2780.0,
                "regularMarketDayLow": 2725.5,
                "previousClose": 2722.75,
                "regularMarketVolume": 5120000
            }
        }],
        "error": null
    }
}"#;

pub const ALPHAVANTAGE_GLOBAL_QUOTE: &str = r#"{
    "Global Quote": {
        "01. symbol": "RELIANCE.NS",
        "02. open": "2730.0000",
        "03. high": "2781.0000",
        "04. low": "2721.0000",
        "05. price": "2751.2000",
        "06. volume": "4980000",
        "07. latest trading day": "2024-05-10",
        "08. previous close": "2722.7500",
        "09. change": "28.4500",
        "10. change percent": "1.0449%"
    }
}"#;

pub const ALPHAVANTAGE_RATE_NOTE: &str = r#"{
    "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
}"#;

pub const TWELVEDATA_QUOTE: &str = r#"{
    "symbol": "RELIANCE.NS",
    "name": "Reliance Industries Limited",
    "exchange": "NSE",
    "close": "2749.80000",
    "high": "2779.00000",
    "low": "2720.10000",
    "previous_close": "2722.75000",
    "volume": "5003112",
    "percent_change": "0.99348"
}"#;

pub const MONEYCONTROL_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Market Reports</title>
    <item>
      <title>Sensex gains 400 points as banking stocks rise</title>
      <link>https://www.moneycontrol.com/news/markets/sensex-gains-1.html</link>
      <pubDate>Fri, 10 May 2024 09:15:00 +0530</pubDate>
    </item>
    <item>
      <title>Monsoon forecast revised upward</title>
      <link>https://www.moneycontrol.com/news/economy/monsoon-2.html</link>
      <pubDate>Fri, 10 May 2024 09:30:00 +0530</pubDate>
    </item>
    <item>
      <title>TCS shares drop after weak guidance</title>
      <link>https://www.moneycontrol.com/news/markets/tcs-3.html</link>
      <pubDate>Fri, 10 May 2024 10:00:00 +0530</pubDate>
    </item>
  </channel>
</rss>"#;

pub const NEWSAPI_HEADLINES: &str = r#"{
    "status": "ok",
    "totalResults": 2,
    "articles": [
        {
            "source": {"id": null, "name": "Mint"},
            "title": "Nifty hits record high on FII buying",
            "url": "https://www.livemint.com/market/nifty-record",
            "publishedAt": "2024-05-10T04:30:00Z"
        },
        {
            "source": {"id": null, "name": "Reuters"},
            "title": "Rupee steady against dollar",
            "url": "https://www.reuters.com/markets/rupee",
            "publishedAt": "2024-05-10T05:00:00Z"
        }
    ]
}"#;

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

pub fn live_quote(raw: &str, price: f64) -> Quote {
    let fields = QuoteFields::new(price, price * 1.01, price * 0.99, price, 1_000_000, 0.0)
        .expect("valid quote fields");
    Quote::from_fields(
        symbol(raw),
        fields,
        ProviderId::Yahoo,
        false,
        UtcDateTime::now(),
    )
}

/// Snapshot on which only `technical.above_vwap` (+10) of the standard rules
/// fires. Tests switch individual metrics on from here.
pub fn neutral_snapshot(raw: &str) -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        symbol: raw.to_owned(),
        risk: RiskMetrics {
            volatility_pct: 25.0,
            beta: 1.0,
            sharpe_ratio: 1.2,
            max_drawdown_pct: -12.0,
        },
        technical: TechnicalIndicators {
            vwap: 1000.0,
            vwap_signal: VwapSignal::Above,
            relative_strength: 50.0,
            bollinger: BollingerPosition::Within,
            squeeze: false,
            sector_performance: String::new(),
        },
        market: MarketContext {
            regime: MarketRegime::Sideways,
            regime_description: String::new(),
            rotation: RotationStance::Neutral,
            rotation_description: String::new(),
        },
        earnings: EarningsIntelligence {
            days_to_earnings: 30,
            surprise_probability_pct: 50.0,
            analyst_upgrades: 0,
            analyst_downgrades: 0,
            forward_pe: 20.0,
        },
        liquidity: LiquidityMetrics { score: 80.0 },
        options: OptionsAnalysis {
            put_call_ratio: 1.0,
            flow: OptionsFlow::Balanced,
        },
        catalysts: Vec::new(),
    }
}
