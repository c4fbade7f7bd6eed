//! Provider adapter contract and its error type.
//!
//! Every upstream integration implements [`Provider`] for one request/payload
//! pair. Adapters never retry: each call is a single attempt, and any failure is
//! reported as a [`SourceError`] so the fallback chain can move on.
//!
//! | Capability | Request | Payload |
//! |------------|---------|---------|
//! | Quotes | [`Symbol`] | [`QuoteFields`](crate::QuoteFields) |
//! | News | [`NewsQuery`] | `Vec<`[`RawNewsEntry`](crate::RawNewsEntry)`>` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::{HttpError, HttpErrorKind};
use crate::{ProviderId, Symbol, ValidationError};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    Malformed,
    InvalidRequest,
    Internal,
}

/// Structured provider failure recorded by the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Map a transport failure for `provider` into a source error.
    pub fn from_transport(provider: ProviderId, error: &HttpError) -> Self {
        let message = format!("{provider} transport error: {}", error.message());
        match error.kind() {
            HttpErrorKind::Timeout => Self::timeout(message),
            HttpErrorKind::Connect | HttpErrorKind::Body | HttpErrorKind::Other => {
                Self::unavailable(message)
            }
        }
    }

    /// Map a non-2xx status for `provider` into a source error.
    pub fn from_status(provider: ProviderId, status: u16) -> Self {
        let message = format!("{provider} upstream returned status {status}");
        match status {
            429 => Self::rate_limited(message),
            400..=499 => Self::invalid_request(message),
            _ => Self::unavailable(message),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::malformed(error.to_string())
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Single upstream integration for one capability.
///
/// Implementations must be `Send + Sync`: one adapter instance is shared by
/// every concurrent acquisition.
pub trait Provider<Req: ?Sized, Payload>: Send + Sync {
    /// Provenance tag recorded on successful results.
    fn id(&self) -> ProviderId;

    /// One bounded attempt against the upstream. Missing required fields must
    /// be reported as [`SourceErrorKind::Malformed`], never as partial data.
    fn fetch<'a>(&'a self, request: &'a Req) -> SourceFuture<'a, Payload>;
}

/// News request keyed by topic: `market` or a lowercase ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub topic: String,
}

impl NewsQuery {
    pub const MARKET: &'static str = "market";

    pub fn new(topic: impl AsRef<str>) -> Self {
        let topic = topic.as_ref().trim();
        Self {
            topic: if topic.is_empty() {
                String::from(Self::MARKET)
            } else {
                topic.to_ascii_lowercase()
            },
        }
    }

    pub fn market() -> Self {
        Self::new(Self::MARKET)
    }

    /// Ticker the topic refers to, if it is not the market-wide topic.
    pub fn symbol(&self) -> Option<Symbol> {
        if self.topic == Self::MARKET {
            None
        } else {
            Symbol::parse(&self.topic).ok()
        }
    }
}
