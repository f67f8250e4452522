use serde::Serialize;
use voltick_core::{ExpiryDate, OptionContract, OptionType, QuoteRouter, Symbol};
use voltick_pricing::{greeks, solve, PricingInputs, PricingRecord, PricingResult};

use crate::cli::IvArgs;
use crate::error::CliError;

use super::market;
use super::CommandResult;

#[derive(Debug, Serialize)]
struct IvResponseData {
    record: PricingRecord,
}

pub async fn run(args: &IvArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let option_type: OptionType = args.option_type.parse()?;
    let expiry = ExpiryDate::parse(&args.expiry)?;
    let contract = OptionContract::new(symbol.clone(), args.strike, expiry, option_type)?;

    let resolved = market::resolve_quote(&symbol, &args.quote, router).await?;

    let valuation = ExpiryDate::from_date(resolved.quote.as_of.date());
    let inputs = PricingInputs::new(
        resolved.quote.spot,
        contract.strike,
        resolved.quote.risk_free_rate,
        resolved.quote.dividend_yield,
        0.0,
        contract.time_to_expiry(valuation),
        option_type,
    )?;

    let solution = solve(args.price, &inputs)?;

    let mut warnings = Vec::new();
    if !solution.converged {
        warnings.push(format!(
            "solver stopped at sigma={:.6} after {} iterations without converging",
            solution.sigma, solution.iterations
        ));
    }

    let solved_inputs = inputs.with_volatility(solution.sigma);
    let quote = resolved.quote.with_volatility(solution.sigma)?;
    let result = PricingResult {
        greeks: greeks(&solved_inputs),
        price: args.price,
        contract,
        quote,
        solver: Some(solution.into()),
    };

    let data = serde_json::to_value(IvResponseData {
        record: result.to_record(),
    })?;

    Ok(CommandResult::ok(data, resolved.source_chain)
        .with_errors(resolved.errors)
        .with_warnings(warnings)
        .with_latency(resolved.latency_ms)
        .with_cache_hit(resolved.cache_hit))
}
