mod news;
mod quote;
mod recommend;
mod snapshot;
mod sources;

use std::sync::Arc;
use std::time::Duration;

use marketlens_core::{
    Acquisition, AcquisitionService, CacheMode, Envelope, EnvelopeError, MarketLensConfig,
    ProviderId, ReqwestHttpClient, Symbol,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub synthetic: bool,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            synthetic: false,
            source_chain,
        }
    }

    /// Merge the provenance of several acquisitions: chains are concatenated
    /// without repeats, `cache_hit` holds only when every value was cached and
    /// any synthetic value marks the whole response synthetic.
    pub fn from_acquisitions<'a, T: 'a>(
        data: Value,
        acquisitions: impl IntoIterator<Item = (&'a str, &'a Acquisition<T>)>,
    ) -> Self {
        let mut result = Self::ok(data, Vec::new());
        let mut all_cached = true;
        let mut seen_any = false;

        for (label, acquisition) in acquisitions {
            seen_any = true;
            for provider in &acquisition.source_chain {
                if !result.source_chain.contains(provider) {
                    result.source_chain.push(*provider);
                }
            }
            result.errors.extend(acquisition.attempts.iter().map(EnvelopeError::from_attempt));
            result.latency_ms = result.latency_ms.max(acquisition.latency_ms);
            all_cached &= acquisition.cache_hit;
            if acquisition.synthetic {
                result.synthetic = true;
                result
                    .warnings
                    .push(format!("synthetic data for {label}: all providers unavailable"));
            }
        }

        result.cache_hit = seen_any && all_cached;
        result
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

/// Services shared by every command in one invocation.
pub struct Context {
    pub config: MarketLensConfig,
    pub acquisition: Arc<AcquisitionService>,
    pub cache_mode: CacheMode,
    pub offline: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = MarketLensConfig::load(cli.config.as_deref())?;

        let acquisition = if cli.offline {
            AcquisitionService::offline(&config)
        } else {
            AcquisitionService::from_config(&config, Arc::new(ReqwestHttpClient::new()))
        };
        let acquisition = match cli.deadline_ms {
            Some(0) => acquisition.with_deadline(None),
            Some(ms) => acquisition.with_deadline(Some(Duration::from_millis(ms))),
            None => acquisition,
        };

        tracing::debug!(
            offline = cli.offline,
            quote_providers = ?config.quote_providers,
            news_providers = ?config.news_providers,
            "configuration loaded"
        );

        Ok(Self {
            config,
            acquisition: Arc::new(acquisition),
            cache_mode: cli.cache.into(),
            offline: cli.offline,
        })
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let context = Context::from_cli(cli)?;

    let command_result = match &cli.command {
        Command::Quote(args) => quote::run(args, &context).await?,
        Command::News(args) => news::run(args, &context).await?,
        Command::Recommend(args) => recommend::run(args, &context).await?,
        Command::Snapshot(args) => snapshot::run(args, &context).await?,
        Command::Sources => sources::run(&context)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        synthetic,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain);
    metadata.latency_ms = latency_ms;
    metadata.cache_hit = cache_hit;
    metadata.synthetic = synthetic;
    metadata.warnings = warnings;

    let meta = metadata.into_envelope_meta()?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

pub(crate) fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|value| Symbol::parse(value).map_err(CliError::from))
        .collect()
}
