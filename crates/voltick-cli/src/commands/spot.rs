use serde::Serialize;
use voltick_core::{MarketQuote, QuoteRouter, SpotRequest, Symbol};

use crate::cli::SpotArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SpotResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<MarketQuote>,
}

pub async fn run(args: &SpotArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let request = SpotRequest::new(symbol);

    match router.route_spot(&request).await {
        Ok(route) => {
            let errors = route
                .failures
                .iter()
                .map(|failure| failure.to_envelope_error())
                .collect();
            let data = serde_json::to_value(SpotResponseData {
                quote: Some(route.data),
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
            let data = serde_json::to_value(SpotResponseData { quote: None })?;
            Ok(CommandResult::ok(data, router.config().providers.clone()).with_errors(errors))
        }
    }
}
