//! Deterministic terminal sources for exhausted fallback chains.
//!
//! Values depend only on the symbol (and the clock for timestamps), so two
//! exhausted resolutions for the same ticker agree. Every record produced here
//! carries `source = fallback` and `synthetic = true`.

use time::Duration as TimeDuration;

use crate::{NewsBatch, NewsItem, ProviderId, Quote, QuoteFields, Sentiment, Symbol, UtcDateTime};

const DEFAULT_BASE_PRICE: f64 = 1000.0;
const DEFAULT_VOLUME: u64 = 1_000_000;

/// Reference price and daily volume per tracked ticker.
const REFERENCE: [(&str, f64, u64); 6] = [
    ("RELIANCE", 2750.0, 4_500_000),
    ("HDFCBANK", 1680.0, 3_650_000),
    ("TCS", 4100.0, 1_980_000),
    ("INFY", 1480.0, 4_200_000),
    ("BHARTIARTL", 950.0, 2_800_000),
    ("ITC", 420.0, 3_200_000),
];

fn reference_for(symbol: &Symbol) -> (f64, u64) {
    REFERENCE
        .iter()
        .find(|(ticker, _, _)| *ticker == symbol.as_str())
        .map(|(_, price, volume)| (*price, *volume))
        .unwrap_or((DEFAULT_BASE_PRICE, DEFAULT_VOLUME))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Synthetic price fields: the reference price is the current price, the day
/// range is +/-2% around it and the previous close sits within +/-2% below or
/// above, so `change_percent` stays consistent with both.
pub fn quote_fields(symbol: &Symbol) -> QuoteFields {
    let seed = symbol.seed();
    let (current_price, reference_volume) = reference_for(symbol);

    let change_percent = ((seed % 401) as f64 - 200.0) / 100.0;
    let previous_close = round2(current_price / (1.0 + change_percent / 100.0));
    let volume = reference_volume / 100 * (80 + (seed / 401) % 41);

    QuoteFields {
        current_price,
        day_high: round2(current_price * 1.02),
        day_low: round2(current_price * 0.98),
        previous_close,
        volume,
        change_percent,
    }
}

pub fn quote(symbol: &Symbol, fetched_at: UtcDateTime) -> Quote {
    Quote::from_fields(
        symbol.clone(),
        quote_fields(symbol),
        ProviderId::Fallback,
        true,
        fetched_at,
    )
}

struct FallbackHeadline {
    symbol: &'static str,
    headline: &'static str,
    sentiment: Sentiment,
    source: &'static str,
    url: &'static str,
}

const FALLBACK_HEADLINES: [FallbackHeadline; 5] = [
    FallbackHeadline {
        symbol: "NIFTY50",
        headline: "Nifty 50 shows resilience, banking and IT stocks in focus",
        sentiment: Sentiment::Positive,
        source: "MoneyControl",
        url: "https://www.moneycontrol.com/news/business/markets/",
    },
    FallbackHeadline {
        symbol: "RELIANCE",
        headline: "Reliance Industries maintains strong fundamentals",
        sentiment: Sentiment::Positive,
        source: "Economic Times",
        url: "https://economictimes.indiatimes.com/markets/stocks/news",
    },
    FallbackHeadline {
        symbol: "TCS",
        headline: "IT sector outlook remains positive amid global digitization trends",
        sentiment: Sentiment::Positive,
        source: "Business Standard",
        url: "https://www.business-standard.com/markets/news",
    },
    FallbackHeadline {
        symbol: "HDFCBANK",
        headline: "Banking sector consolidation creates opportunities for market leaders",
        sentiment: Sentiment::Neutral,
        source: "LiveMint",
        url: "https://www.livemint.com/market/stock-market-news",
    },
    FallbackHeadline {
        symbol: "MARKET",
        headline: "FII inflows support Indian equity markets, volatility remains manageable",
        sentiment: Sentiment::Positive,
        source: "Financial Express",
        url: "https://www.financialexpress.com/market/",
    },
];

/// Five fixed items, ids `fallback-1` to `fallback-5`, spaced a minute apart
/// ending at `fetched_at`.
pub fn news(topic: &str, fetched_at: UtcDateTime) -> NewsBatch {
    let items = FALLBACK_HEADLINES
        .iter()
        .enumerate()
        .map(|(index, entry)| NewsItem {
            id: format!("fallback-{}", index + 1),
            symbol: String::from(entry.symbol),
            headline: String::from(entry.headline),
            sentiment: entry.sentiment,
            source: String::from(entry.source),
            url: String::from(entry.url),
            published_at: UtcDateTime::from_offset_datetime(
                fetched_at.into_inner() - TimeDuration::minutes(index as i64),
            ),
            provider: ProviderId::Fallback,
            synthetic: true,
        })
        .collect();

    NewsBatch {
        topic: topic.to_owned(),
        items,
        provider: ProviderId::Fallback,
        synthetic: true,
        fetched_at,
    }
}
