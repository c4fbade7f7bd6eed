use marketlens_core::{Capability, ProviderId, ProviderPolicy};
use serde::Serialize;

use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    offline: bool,
    capabilities: Vec<CapabilitySummary>,
}

#[derive(Debug, Serialize)]
struct CapabilitySummary {
    capability: Capability,
    cache_ttl_ms: u64,
    providers: Vec<SourceSummary>,
}

#[derive(Debug, Serialize)]
struct SourceSummary {
    id: ProviderId,
    name: &'static str,
    priority: usize,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota: Option<QuotaSummary>,
}

#[derive(Debug, Serialize)]
struct QuotaSummary {
    limit: u32,
    window_secs: u64,
}

pub fn run(context: &Context) -> Result<CommandResult, CliError> {
    let quote_providers = context.acquisition.quote_providers();
    let news_providers = context.acquisition.news_providers();

    let capabilities = vec![
        CapabilitySummary {
            capability: Capability::Quote,
            cache_ttl_ms: millis(context.acquisition.quote_ttl()),
            providers: summarize(context, &quote_providers),
        },
        CapabilitySummary {
            capability: Capability::News,
            cache_ttl_ms: millis(context.acquisition.news_ttl()),
            providers: summarize(context, &news_providers),
        },
    ];

    let data = serde_json::to_value(SourcesResponseData {
        offline: context.offline,
        capabilities,
    })?;

    let mut source_chain: Vec<ProviderId> =
        quote_providers.into_iter().chain(news_providers).collect();
    source_chain.push(ProviderId::Fallback);

    Ok(CommandResult::ok(data, source_chain))
}

/// Configured order followed by the synthetic terminal source.
fn summarize(context: &Context, order: &[ProviderId]) -> Vec<SourceSummary> {
    order
        .iter()
        .copied()
        .chain(std::iter::once(ProviderId::Fallback))
        .enumerate()
        .map(|(index, id)| SourceSummary {
            id,
            name: id.display_name(),
            priority: index + 1,
            timeout_ms: if id == ProviderId::Fallback {
                0
            } else {
                millis(context.config.timeout_for(id))
            },
            quota: ProviderPolicy::default_for(id).map(|policy| QuotaSummary {
                limit: policy.quota_limit,
                window_secs: policy.quota_window.as_secs(),
            }),
        })
        .collect()
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
