//! # Domain Models
//!
//! Canonical, validated value types shared by acquisition and scoring.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Uppercase canonical ticker |
//! | [`UtcDateTime`] | UTC timestamp |
//! | [`QuoteFields`] | Price fields extracted by quote adapters |
//! | [`Quote`] | Quote with `source` / `synthetic` provenance |
//! | [`RawNewsEntry`] | Feed entry before curation |
//! | [`NewsItem`] | Curated item with sentiment and provenance |
//! | [`ScoreFactors`] | Bullish/bearish totals and ordered reasons |
//! | [`Recommendation`] | Projected trade decision |
//!
//! Provenance is a typed field on every record, never a marker embedded in text:
//!
//! ```rust,ignore
//! let quote = service.get_quote(&symbol).await;
//! if quote.synthetic {
//!     // all upstream providers failed; `quote.source` is `ProviderId::Fallback`
//! }
//! ```

mod news;
mod quote;
mod recommendation;
mod symbol;
mod timestamp;

pub use news::{NewsBatch, NewsItem, RawNewsEntry, Sentiment};
pub use quote::{Quote, QuoteFields};
pub use recommendation::{
    Action, Confidence, PercentRange, Recommendation, RiskLevel, ScoreFactors,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
