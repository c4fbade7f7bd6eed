use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{ProviderId, UtcDateTime};

/// Headline polarity derived from keyword counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed entry as returned by a news adapter, before curation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNewsEntry {
    pub headline: String,
    pub url: String,
    pub published_at: Option<UtcDateTime>,
    /// Publisher label when the feed reports one (NewsAPI aggregates many).
    pub publisher: Option<String>,
}

impl RawNewsEntry {
    pub fn new(headline: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            url: url.into(),
            published_at: None,
            publisher: None,
        }
    }

    pub fn with_published_at(mut self, published_at: UtcDateTime) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }
}

/// Curated news item. `symbol` is a tracked ticker, an index name, or `MARKET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub symbol: String,
    pub headline: String,
    pub sentiment: Sentiment,
    /// Publisher label, e.g. `Economic Times`.
    pub source: String,
    pub url: String,
    pub published_at: UtcDateTime,
    /// Provider that produced the batch this item belongs to.
    pub provider: ProviderId,
    pub synthetic: bool,
}

/// One acquisition result for a news topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsBatch {
    pub topic: String,
    pub items: Vec<NewsItem>,
    pub provider: ProviderId,
    pub synthetic: bool,
    pub fetched_at: UtcDateTime,
}
