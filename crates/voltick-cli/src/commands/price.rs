use serde::Serialize;
use voltick_core::{ExpiryDate, OptionContract, OptionType, QuoteRouter, Symbol};
use voltick_pricing::{greeks, price, PricingInputs, PricingRecord, PricingResult};

use crate::cli::PriceArgs;
use crate::error::CliError;

use super::market;
use super::CommandResult;

#[derive(Debug, Serialize)]
struct PriceResponseData {
    record: PricingRecord,
}

pub async fn run(args: &PriceArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let option_type: OptionType = args.option_type.parse()?;
    let expiry = ExpiryDate::parse(&args.expiry)?;
    let contract = OptionContract::new(symbol.clone(), args.strike, expiry, option_type)?;

    let resolved = market::resolve_quote(&symbol, &args.quote, router).await?;
    let quote = resolved.quote;

    let valuation = ExpiryDate::from_date(quote.as_of.date());
    let time_to_expiry = contract.time_to_expiry(valuation);
    let inputs = PricingInputs::new(
        quote.spot,
        contract.strike,
        quote.risk_free_rate,
        quote.dividend_yield,
        quote.volatility,
        time_to_expiry,
        option_type,
    )?;

    let mut warnings = Vec::new();
    if time_to_expiry <= 0.0 {
        warnings.push(String::from(
            "contract is expired; price is intrinsic value",
        ));
    } else if inputs.volatility <= 0.0 {
        warnings.push(String::from(
            "volatility is zero; price is discounted intrinsic (pass --vol or fetch live data)",
        ));
    }

    let result = PricingResult {
        price: price(&inputs),
        greeks: greeks(&inputs),
        contract,
        quote,
        solver: None,
    };

    let data = serde_json::to_value(PriceResponseData {
        record: result.to_record(),
    })?;

    Ok(CommandResult::ok(data, resolved.source_chain)
        .with_errors(resolved.errors)
        .with_warnings(warnings)
        .with_latency(resolved.latency_ms)
        .with_cache_hit(resolved.cache_hit))
}
