use std::sync::Arc;

use marketlens_core::{AnalyticsSnapshot, RecommendationService, ScoreFactors, Symbol};
use serde::Serialize;

use crate::cli::SnapshotArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct SnapshotResponseData {
    symbol: String,
    current_price: f64,
    snapshot: AnalyticsSnapshot,
    factors: ScoreFactors,
    net_score: i64,
}

/// The snapshot is evaluated against a live quote, so VWAP position and the
/// fired rules reflect the price the scorer would see.
pub async fn run(args: &SnapshotArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let service =
        RecommendationService::from_config(&context.config, Arc::clone(&context.acquisition))?;

    let assessment = service.assess(&symbol, context.cache_mode).await?;
    let net_score = assessment.factors.net_score();

    let data = serde_json::to_value(SnapshotResponseData {
        symbol: symbol.to_string(),
        current_price: assessment.quote.value.current_price,
        snapshot: assessment.snapshot,
        factors: assessment.factors,
        net_score,
    })?;

    Ok(CommandResult::from_acquisitions(
        data,
        [(symbol.as_str(), &assessment.quote)],
    ))
}
