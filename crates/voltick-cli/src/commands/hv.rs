use serde::Serialize;
use voltick_core::{HistVolRequest, QuoteRouter, Symbol, VolEstimate};

use crate::cli::HvArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct HvResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    estimate: Option<VolEstimate>,
}

pub async fn run(args: &HvArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let request = HistVolRequest::new(symbol, args.window)
        .map_err(|error| CliError::Command(error.to_string()))?;

    match router.route_hist_vol(&request).await {
        Ok(route) => {
            let errors = route
                .failures
                .iter()
                .map(|failure| failure.to_envelope_error())
                .collect();
            let data = serde_json::to_value(HvResponseData {
                estimate: Some(route.data),
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
            let data = serde_json::to_value(HvResponseData { estimate: None })?;
            Ok(CommandResult::ok(data, router.config().providers.clone()).with_errors(errors))
        }
    }
}
