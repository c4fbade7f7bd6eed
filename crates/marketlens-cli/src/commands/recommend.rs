use std::sync::Arc;

use marketlens_core::{EnvelopeError, ProviderId, Recommendation, RecommendationService};
use serde::Serialize;

use crate::cli::RecommendArgs;
use crate::error::CliError;

use super::{parse_symbols, CommandResult, Context};

#[derive(Debug, Serialize)]
struct RecommendResponseData {
    recommendations: Vec<Recommendation>,
}

pub async fn run(args: &RecommendArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let service =
        RecommendationService::from_config(&context.config, Arc::clone(&context.acquisition))?;

    let mut assessments = Vec::with_capacity(symbols.len());
    let mut errors = Vec::new();
    for (symbol, outcome) in symbols
        .iter()
        .zip(service.assess_many(&symbols, context.cache_mode).await)
    {
        match outcome {
            Ok(assessment) => assessments.push(assessment),
            // A single symbol without analytics fails the whole command.
            Err(error) if symbols.len() == 1 => return Err(error.into()),
            Err(error) => errors.push(EnvelopeError::new(
                "analytics.snapshot",
                format!("{symbol}: {error}"),
            )?),
        }
    }

    let recommendations = assessments
        .iter()
        .map(|assessment| assessment.recommendation.clone())
        .collect();
    let data = serde_json::to_value(RecommendResponseData { recommendations })?;

    let mut result = CommandResult::from_acquisitions(
        data,
        assessments
            .iter()
            .map(|assessment| (assessment.recommendation.symbol.as_str(), &assessment.quote)),
    );
    if result.source_chain.is_empty() {
        result.source_chain = context.acquisition.quote_providers();
        result.source_chain.push(ProviderId::Fallback);
    }
    Ok(result.with_errors(errors))
}
