//! Shared market-input resolution for pricing commands.
//!
//! `--spot` switches to fully manual inputs (no network, provider
//! `manual`); otherwise the quote comes from the router and any supplied
//! override replaces the fetched field.

use voltick_core::{
    EnvelopeError, MarketQuote, ProviderId, QuoteRouter, SpotRequest, Symbol, UtcDateTime,
    DEFAULT_RISK_FREE_RATE,
};

use crate::cli::QuoteOverrideArgs;
use crate::error::CliError;

pub struct ResolvedQuote {
    pub quote: MarketQuote,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

pub async fn resolve_quote(
    symbol: &Symbol,
    overrides: &QuoteOverrideArgs,
    router: &QuoteRouter,
) -> Result<ResolvedQuote, CliError> {
    if let Some(spot) = overrides.spot {
        let quote = MarketQuote::new(
            symbol.clone(),
            spot,
            overrides.rate.unwrap_or(DEFAULT_RISK_FREE_RATE),
            overrides.dividend_yield.unwrap_or(0.0),
            overrides.vol.unwrap_or(0.0),
            UtcDateTime::now(),
            ProviderId::Manual,
            None,
            None,
        )?;
        return Ok(ResolvedQuote {
            quote,
            source_chain: vec![ProviderId::Manual],
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
        });
    }

    let request = SpotRequest::new(symbol.clone());
    let route = router
        .route_spot(&request)
        .await
        .map_err(|error| CliError::Command(error.to_string()))?;

    let fetched = route.data;
    let quote = MarketQuote::new(
        fetched.symbol.clone(),
        fetched.spot,
        overrides.rate.unwrap_or(fetched.risk_free_rate),
        overrides.dividend_yield.unwrap_or(fetched.dividend_yield),
        overrides.vol.unwrap_or(fetched.volatility),
        fetched.as_of,
        fetched.provider,
        fetched.bid,
        fetched.ask,
    )?;

    Ok(ResolvedQuote {
        quote,
        source_chain: route.provider_chain,
        errors: route
            .failures
            .iter()
            .map(|failure| failure.to_envelope_error())
            .collect(),
        latency_ms: route.latency_ms,
        cache_hit: route.cache_hit,
    })
}
