use marketlens_core::{NewsItem, NewsQuery, Symbol};
use serde::Serialize;

use crate::cli::NewsArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct NewsResponseData {
    topic: String,
    items: Vec<NewsItem>,
}

pub async fn run(args: &NewsArgs, context: &Context) -> Result<CommandResult, CliError> {
    let query = NewsQuery::new(&args.topic);
    if query.topic != NewsQuery::MARKET {
        Symbol::parse(&query.topic)?;
    }

    let acquisition = context
        .acquisition
        .acquire_news(&query, context.cache_mode)
        .await;

    let data = serde_json::to_value(NewsResponseData {
        topic: query.topic.clone(),
        items: acquisition.value.items.clone(),
    })?;

    Ok(CommandResult::from_acquisitions(
        data,
        [(query.topic.as_str(), &acquisition)],
    ))
}
