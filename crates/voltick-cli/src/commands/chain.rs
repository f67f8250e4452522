use serde::Serialize;
use voltick_core::{ChainRequest, ExpiryDate, OptionChain, QuoteRouter, Symbol};

use crate::cli::ChainArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ChainResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<OptionChain>,
}

pub async fn run(args: &ChainArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let expiry = args
        .expiry
        .as_deref()
        .map(ExpiryDate::parse)
        .transpose()?;
    let request = ChainRequest::new(symbol, expiry);

    match router.route_chain(&request).await {
        Ok(route) => {
            let errors = route
                .failures
                .iter()
                .map(|failure| failure.to_envelope_error())
                .collect();
            let data = serde_json::to_value(ChainResponseData {
                chain: Some(route.data),
            })?;
            Ok(CommandResult::ok(data, route.provider_chain)
                .with_errors(errors)
                .with_latency(route.latency_ms)
                .with_cache_hit(route.cache_hit))
        }
        Err(error) => {
            let errors = error
                .failures()
                .iter()
                .map(|failure| failure.to_envelope_error())
                .collect();
            let data = serde_json::to_value(ChainResponseData { chain: None })?;
            Ok(CommandResult::ok(data, router.config().providers.clone()).with_errors(errors))
        }
    }
}
