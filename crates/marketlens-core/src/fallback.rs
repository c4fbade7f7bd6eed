//! Ordered provider fallback with a synthetic terminal source.
//!
//! A [`FallbackChain`] tries its providers strictly in configured order. Each
//! attempt is bounded by a per-attempt timeout and by whatever remains of the
//! caller's deadline. The first payload the [`ChainPolicy`] accepts wins and no
//! later provider is invoked. Failures are recorded and logged, never returned:
//! when every provider fails the policy synthesizes a value tagged
//! [`ProviderId::Fallback`] with `synthetic = true`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::provider::{Provider, SourceError};
use crate::ProviderId;

/// Capability-specific half of a chain: what a usable payload is and what to
/// return when nothing is.
pub trait ChainPolicy: Send + Sync {
    type Request: Send + Sync;
    type Raw: Send;
    type Output: Send;

    /// Turn a provider payload into the chain output, or reject it as
    /// structurally unusable.
    fn accept(
        &self,
        request: &Self::Request,
        provider: ProviderId,
        raw: Self::Raw,
    ) -> Result<Self::Output, SourceError>;

    /// Deterministic terminal value. Must not fail.
    fn synthesize(&self, request: &Self::Request) -> Self::Output;

    /// Short label for log lines, e.g. the ticker.
    fn describe(&self, request: &Self::Request) -> String;
}

/// One provider attempt that did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub provider: ProviderId,
    pub error: SourceError,
}

/// Chain result with provenance and diagnostics.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ProviderId,
    pub synthetic: bool,
    /// Providers actually invoked, in order, ending with the winner.
    pub source_chain: Vec<ProviderId>,
    pub attempts: Vec<AttemptFailure>,
    pub latency_ms: u64,
}

pub struct FallbackChain<P: ChainPolicy> {
    policy: P,
    providers: Vec<Arc<dyn Provider<P::Request, P::Raw>>>,
    attempt_timeout: Duration,
    timeout_overrides: BTreeMap<ProviderId, Duration>,
}

impl<P: ChainPolicy> FallbackChain<P> {
    pub fn new(
        policy: P,
        providers: Vec<Arc<dyn Provider<P::Request, P::Raw>>>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            providers,
            attempt_timeout,
            timeout_overrides: BTreeMap::new(),
        }
    }

    pub fn with_timeout_overrides(mut self, overrides: BTreeMap<ProviderId, Duration>) -> Self {
        self.timeout_overrides = overrides;
        self
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn timeout_for(&self, provider: ProviderId) -> Duration {
        self.timeout_overrides
            .get(&provider)
            .copied()
            .unwrap_or(self.attempt_timeout)
    }

    /// Resolve `request`, optionally bounded by a total `deadline` shared
    /// across attempts. Never fails.
    pub async fn resolve(
        &self,
        request: &P::Request,
        deadline: Option<Duration>,
    ) -> Resolved<P::Output> {
        let started = Instant::now();
        let subject = self.policy.describe(request);
        let mut source_chain = Vec::with_capacity(self.providers.len() + 1);
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let id = provider.id();
            let mut timeout = self.timeout_for(id);
            if let Some(deadline) = deadline {
                match deadline.checked_sub(started.elapsed()) {
                    Some(remaining) if !remaining.is_zero() => timeout = timeout.min(remaining),
                    _ => {
                        tracing::warn!(
                            subject = %subject,
                            provider = %id,
                            deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                            "request deadline exceeded, skipping remaining providers"
                        );
                        attempts.push(AttemptFailure {
                            provider: id,
                            error: SourceError::timeout("request deadline exceeded before attempt"),
                        });
                        break;
                    }
                }
            }

            source_chain.push(id);
            tracing::debug!(subject = %subject, provider = %id, "provider attempt");

            let outcome = match tokio::time::timeout(timeout, provider.fetch(request)).await {
                Ok(Ok(raw)) => self.policy.accept(request, id, raw),
                Ok(Err(error)) => Err(error),
                Err(_) => Err(SourceError::timeout(format!(
                    "{id} did not respond within {}ms",
                    timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(value) => {
                    let latency_ms = elapsed_ms(started);
                    tracing::info!(
                        subject = %subject,
                        provider = %id,
                        synthetic = false,
                        latency_ms,
                        "resolved"
                    );
                    return Resolved {
                        value,
                        source: id,
                        synthetic: false,
                        source_chain,
                        attempts,
                        latency_ms,
                    };
                }
                Err(error) => {
                    tracing::warn!(
                        subject = %subject,
                        provider = %id,
                        code = error.code(),
                        message = error.message(),
                        "provider attempt failed"
                    );
                    attempts.push(AttemptFailure {
                        provider: id,
                        error,
                    });
                }
            }
        }

        source_chain.push(ProviderId::Fallback);
        let latency_ms = elapsed_ms(started);
        tracing::warn!(
            subject = %subject,
            failed_attempts = attempts.len(),
            latency_ms,
            "all providers failed, returning synthetic result"
        );

        Resolved {
            value: self.policy.synthesize(request),
            source: ProviderId::Fallback,
            synthetic: true,
            source_chain,
            attempts,
            latency_ms,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
