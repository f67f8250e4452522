use serde::Serialize;
use voltick_core::QuoteRouter;
use voltick_pricing::{evaluate, linear_grid, LegInstrument, Strategy, StrategyEvaluation};

use crate::cli::StrategyArgs;
use crate::error::CliError;

use super::market;
use super::CommandResult;

#[derive(Debug, Serialize)]
struct StrategyResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    evaluation: StrategyEvaluation,
}

pub async fn run(args: &StrategyArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let text = std::fs::read_to_string(&args.file)?;
    let parsed: Strategy = serde_json::from_str(&text)?;
    // Re-validate: hand-written files can carry empty legs or zero quantities.
    let strategy = Strategy::new(parsed.name.clone(), parsed.legs.clone(), parsed.entry_cost)?;

    let symbol = strategy
        .legs
        .iter()
        .find_map(|leg| match &leg.instrument {
            LegInstrument::Option(contract) => Some(contract.symbol.clone()),
            LegInstrument::Underlying => None,
        })
        .ok_or_else(|| {
            CliError::Command(String::from(
                "strategy needs at least one option leg to identify the underlying",
            ))
        })?;

    let resolved = market::resolve_quote(&symbol, &args.quote, router).await?;
    let quote = resolved.quote;

    let grid_min = args.grid_min.unwrap_or(0.5 * quote.spot);
    let grid_max = args.grid_max.unwrap_or(1.5 * quote.spot);
    let grid = linear_grid(grid_min, grid_max, args.grid_steps)?;

    let evaluation = evaluate(&strategy, &quote, &grid)?;

    let data = serde_json::to_value(StrategyResponseData {
        name: strategy.name.clone(),
        evaluation,
    })?;

    Ok(CommandResult::ok(data, resolved.source_chain)
        .with_errors(resolved.errors)
        .with_latency(resolved.latency_ms)
        .with_cache_hit(resolved.cache_hit))
}
