use marketlens_core::Quote;
use serde::Serialize;

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::{parse_symbols, CommandResult, Context};

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<Quote>,
}

pub async fn run(args: &QuoteArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;

    let acquisitions = context
        .acquisition
        .acquire_quotes(&symbols, context.cache_mode)
        .await;

    let quotes = acquisitions
        .iter()
        .map(|acquisition| acquisition.value.clone())
        .collect();
    let data = serde_json::to_value(QuoteResponseData { quotes })?;

    Ok(CommandResult::from_acquisitions(
        data,
        symbols
            .iter()
            .map(|symbol| symbol.as_str())
            .zip(acquisitions.iter()),
    ))
}
