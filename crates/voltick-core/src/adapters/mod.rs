//! Provider adapters.
//!
//! Each adapter implements [`MarketDataSource`](crate::MarketDataSource) in
//! two modes: against a real transport it calls the provider's HTTP API and
//! normalizes the JSON payload; against a mock transport it synthesizes
//! deterministic data seeded from the symbol, so offline runs and tests are
//! reproducible.

mod alpaca;
mod polygon;
mod yahoo;

pub use alpaca::AlpacaAdapter;
pub use polygon::PolygonAdapter;
pub use yahoo::YahooAdapter;

use crate::{ProviderError, Symbol, ValidationError};

/// Flat rate assumption used when no curve source is configured.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Trading days per year used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub(crate) fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

/// Annualized volatility from a close series: sample standard deviation of
/// daily log returns, scaled by sqrt(252). Needs at least two closes.
pub(crate) fn annualized_vol(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|pair| pair[0] > 0.0 && pair[1] > 0.0)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Map an upstream HTTP status to a provider error for fallback handling.
pub(crate) fn status_to_error(provider: &str, status: u16) -> ProviderError {
    match status {
        401 | 403 => ProviderError::auth_failed(format!("{provider} rejected credentials ({status})")),
        404 => ProviderError::not_found(format!("{provider} returned 404 for this request")),
        429 => ProviderError::rate_limited(format!("{provider} rate limit hit (429)")),
        408 | 500..=599 => {
            ProviderError::unavailable(format!("{provider} upstream returned status {status}"))
        }
        _ => ProviderError::invalid_request(format!("{provider} returned status {status}")),
    }
}

pub(crate) fn validation_to_error(error: ValidationError) -> ProviderError {
    ProviderError::malformed_payload(error.to_string())
}
