//! News curation: relevance filtering, tagging, de-duplication and ordering of
//! raw feed entries.
//!
//! Curation runs on each provider's batch before the fallback chain judges it.
//! A batch that curates down to nothing is unusable and the chain moves on.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::provider::NewsQuery;
use crate::{NewsItem, ProviderId, RawNewsEntry, Sentiment, UtcDateTime};

const POSITIVE_WORDS: [&str; 9] = [
    "gain", "rise", "up", "high", "strong", "beat", "win", "growth", "positive",
];
const NEGATIVE_WORDS: [&str; 9] = [
    "fall", "drop", "down", "low", "weak", "miss", "loss", "decline", "negative",
];

/// Terms that make a headline relevant, plus the batch size cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceFilter {
    pub keywords: Vec<String>,
    pub tracked_symbols: Vec<String>,
    pub max_items: usize,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self {
            keywords: [
                "stock",
                "market",
                "nifty",
                "sensex",
                "share",
                "equity",
                "trading",
                "investment",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            tracked_symbols: [
                "RELIANCE",
                "TCS",
                "HDFCBANK",
                "INFY",
                "ITC",
                "BHARTIARTL",
                "ADANIGREEN",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_items: 7,
        }
    }
}

impl RelevanceFilter {
    pub fn is_relevant(&self, headline: &str, query: &NewsQuery) -> bool {
        let lowered = headline.to_lowercase();
        let topic_term = query.symbol().map(|symbol| symbol.as_str().to_lowercase());

        self.keywords
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .chain(self.tracked_symbols.iter().map(|symbol| symbol.to_lowercase()))
            .chain(topic_term)
            .any(|term| !term.is_empty() && lowered.contains(&term))
    }

    /// First tracked ticker named in the headline, else the index it mentions,
    /// else `MARKET`.
    pub fn extract_symbol(&self, headline: &str) -> String {
        let upper = headline.to_uppercase();
        if let Some(symbol) = self
            .tracked_symbols
            .iter()
            .find(|symbol| upper.contains(&symbol.to_uppercase()))
        {
            return symbol.to_uppercase();
        }
        if upper.contains("NIFTY") {
            String::from("NIFTY50")
        } else if upper.contains("SENSEX") {
            String::from("SENSEX")
        } else {
            String::from("MARKET")
        }
    }
}

/// Whole-word keyword vote; ties are neutral.
pub fn classify_sentiment(headline: &str) -> Sentiment {
    let lowered = headline.to_lowercase();
    let (mut positive, mut negative) = (0_usize, 0_usize);
    for word in lowered.split(|ch: char| !ch.is_alphanumeric()) {
        if POSITIVE_WORDS.contains(&word) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word) {
            negative += 1;
        }
    }

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Case-folded, whitespace-collapsed headline used as the duplicate key.
pub fn normalize_headline(headline: &str) -> String {
    headline
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop items whose normalized headline or URL was already seen. First wins.
pub fn dedupe(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut headlines = HashSet::new();
    let mut urls = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh_headline = !headlines.contains(&normalize_headline(&item.headline));
            let fresh_url = item.url.is_empty() || !urls.contains(item.url.trim());
            if fresh_headline && fresh_url {
                headlines.insert(normalize_headline(&item.headline));
                if !item.url.is_empty() {
                    urls.insert(item.url.trim().to_owned());
                }
                true
            } else {
                false
            }
        })
        .collect()
}

/// Turn one provider's raw entries into a curated batch.
pub fn curate(
    filter: &RelevanceFilter,
    query: &NewsQuery,
    provider: ProviderId,
    entries: Vec<RawNewsEntry>,
    fetched_at: UtcDateTime,
) -> Vec<NewsItem> {
    let tagged = entries
        .into_iter()
        .filter(|entry| filter.is_relevant(&entry.headline, query))
        .map(|entry| NewsItem {
            id: String::new(),
            symbol: filter.extract_symbol(&entry.headline),
            sentiment: classify_sentiment(&entry.headline),
            source: entry
                .publisher
                .unwrap_or_else(|| String::from(provider.display_name())),
            published_at: entry.published_at.unwrap_or(fetched_at),
            headline: entry.headline,
            url: entry.url,
            provider,
            synthetic: false,
        })
        .collect();

    let mut items = dedupe(tagged);
    items.sort_by_key(|item| Reverse(item.published_at));
    items.truncate(filter.max_items);
    for (index, item) in items.iter_mut().enumerate() {
        item.id = format!("{}-{}", provider.as_str(), index + 1);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("valid timestamp")
    }

    #[test]
    fn sentiment_counts_whole_words_only() {
        assert_eq!(
            classify_sentiment("Sensex gains as IT stocks rise"),
            Sentiment::Positive
        );
        assert_eq!(classify_sentiment("Markets fall on weak cues"), Sentiment::Negative);
        // "upgrade" and "lower" do not contain whole sentiment words
        assert_eq!(classify_sentiment("Analyst upgrade lowers target"), Sentiment::Neutral);
        assert_eq!(classify_sentiment("Nifty rise offsets bank drop"), Sentiment::Neutral);
    }

    #[test]
    fn symbol_extraction_prefers_tracked_tickers() {
        let filter = RelevanceFilter::default();
        assert_eq!(filter.extract_symbol("Reliance and TCS lead"), "RELIANCE");
        assert_eq!(filter.extract_symbol("Nifty ends flat"), "NIFTY50");
        assert_eq!(filter.extract_symbol("Sensex slips"), "SENSEX");
        assert_eq!(filter.extract_symbol("Rupee steady"), "MARKET");
    }

    #[test]
    fn symbol_topic_counts_as_relevance_term() {
        let filter = RelevanceFilter {
            keywords: Vec::new(),
            tracked_symbols: Vec::new(),
            max_items: 7,
        };
        assert!(filter.is_relevant("Wipro wins deal", &NewsQuery::new("WIPRO")));
        assert!(!filter.is_relevant("Wipro wins deal", &NewsQuery::market()));
    }

    #[test]
    fn curate_filters_dedupes_sorts_and_numbers() {
        let entries = vec![
            RawNewsEntry::new("Sensex rises 300 points", "https://x.test/1")
                .with_published_at(at("2024-05-10T03:00:00Z")),
            RawNewsEntry::new("Monsoon forecast updated", "https://x.test/2")
                .with_published_at(at("2024-05-10T04:00:00Z")),
            RawNewsEntry::new("SENSEX  rises 300 points", "https://x.test/3")
                .with_published_at(at("2024-05-10T05:00:00Z")),
            RawNewsEntry::new("TCS shares drop", "https://x.test/1")
                .with_published_at(at("2024-05-10T06:00:00Z")),
            RawNewsEntry::new("Infy stock steady", "https://x.test/5")
                .with_published_at(at("2024-05-10T07:00:00Z")),
        ];

        let items = curate(
            &RelevanceFilter::default(),
            &NewsQuery::market(),
            ProviderId::Moneycontrol,
            entries,
            at("2024-05-10T08:00:00Z"),
        );

        let headlines: Vec<&str> = items.iter().map(|item| item.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Infy stock steady", "Sensex rises 300 points"]);
        assert_eq!(items[0].id, "moneycontrol-1");
        assert_eq!(items[1].id, "moneycontrol-2");
        assert_eq!(items[0].symbol, "INFY");
        assert_eq!(items[1].source, "MoneyControl");
    }

    #[test]
    fn curate_caps_batch_size() {
        let entries = (0..12)
            .map(|n| RawNewsEntry::new(format!("Market update {n}"), format!("https://x.test/{n}")))
            .collect();

        let items = curate(
            &RelevanceFilter::default(),
            &NewsQuery::market(),
            ProviderId::Newsapi,
            entries,
            UtcDateTime::now(),
        );

        assert_eq!(items.len(), 7);
        assert_eq!(items[0].headline, "Market update 0", "ties keep feed order");
    }
}
