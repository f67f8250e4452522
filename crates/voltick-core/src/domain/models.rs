use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ExpiryDate, ProviderId, Symbol, UtcDateTime, ValidationError};

/// Exercise style of a vanilla contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }

    /// Exercise value at a given underlying price.
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }

    /// +1 for calls, −1 for puts; the sign of ∂payoff/∂spot in the money.
    pub const fn parity_sign(self) -> f64 {
        match self {
            Self::Call => 1.0,
            Self::Put => -1.0,
        }
    }
}

impl Display for OptionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            other => Err(ValidationError::InvalidOptionType {
                value: other.to_owned(),
            }),
        }
    }
}

/// A single vanilla European option. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: Symbol,
    pub strike: f64,
    pub expiry: ExpiryDate,
    pub option_type: OptionType,
}

impl OptionContract {
    pub fn new(
        symbol: Symbol,
        strike: f64,
        expiry: ExpiryDate,
        option_type: OptionType,
    ) -> Result<Self, ValidationError> {
        validate_positive("strike", strike)?;
        Ok(Self {
            symbol,
            strike,
            expiry,
            option_type,
        })
    }

    /// ACT/365 year fraction to expiry; ≤ 0 for expired contracts.
    pub fn time_to_expiry(&self, valuation: ExpiryDate) -> f64 {
        self.expiry.year_fraction(valuation)
    }
}

/// Normalized market snapshot for one underlying.
///
/// All numeric fields are non-negative except `risk_free_rate` and
/// `dividend_yield`, which may be any finite real (negative-rate regimes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub symbol: Symbol,
    pub spot: f64,
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
    pub volatility: f64,
    pub as_of: UtcDateTime,
    pub provider: ProviderId,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

impl MarketQuote {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        spot: f64,
        risk_free_rate: f64,
        dividend_yield: f64,
        volatility: f64,
        as_of: UtcDateTime,
        provider: ProviderId,
        bid: Option<f64>,
        ask: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("spot", spot)?;
        validate_finite("risk_free_rate", risk_free_rate)?;
        validate_finite("dividend_yield", dividend_yield)?;
        validate_non_negative("volatility", volatility)?;
        validate_optional_non_negative("bid", bid)?;
        validate_optional_non_negative("ask", ask)?;

        Ok(Self {
            symbol,
            spot,
            risk_free_rate,
            dividend_yield,
            volatility,
            as_of,
            provider,
            bid,
            ask,
        })
    }

    /// Snapshot with the volatility replaced, e.g. after an implied-vol solve.
    pub fn with_volatility(&self, volatility: f64) -> Result<Self, ValidationError> {
        validate_non_negative("volatility", volatility)?;
        Ok(Self {
            volatility,
            ..self.clone()
        })
    }

    /// Midpoint of bid/ask when both sides are quoted.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }
}

/// One row of an option chain, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractQuote {
    pub strike: f64,
    pub option_type: OptionType,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
}

impl ContractQuote {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strike: f64,
        option_type: OptionType,
        bid: Option<f64>,
        ask: Option<f64>,
        last: Option<f64>,
        implied_volatility: Option<f64>,
        volume: Option<u64>,
        open_interest: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_positive("strike", strike)?;
        validate_optional_non_negative("bid", bid)?;
        validate_optional_non_negative("ask", ask)?;
        validate_optional_non_negative("last", last)?;
        validate_optional_non_negative("implied_volatility", implied_volatility)?;

        Ok(Self {
            strike,
            option_type,
            bid,
            ask,
            last,
            implied_volatility,
            volume,
            open_interest,
        })
    }

    /// Best observable price: bid/ask midpoint, else last trade.
    pub fn best_price(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid > 0.0 || ask > 0.0 => Some((bid + ask) / 2.0),
            _ => self.last,
        }
    }
}

/// Normalized option chain for one underlying and expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: Symbol,
    pub expiry: ExpiryDate,
    pub spot: f64,
    pub as_of: UtcDateTime,
    pub provider: ProviderId,
    pub contracts: Vec<ContractQuote>,
}

impl OptionChain {
    pub fn new(
        symbol: Symbol,
        expiry: ExpiryDate,
        spot: f64,
        as_of: UtcDateTime,
        provider: ProviderId,
        contracts: Vec<ContractQuote>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("spot", spot)?;
        Ok(Self {
            symbol,
            expiry,
            spot,
            as_of,
            provider,
            contracts,
        })
    }

    pub fn call_at(&self, strike: f64) -> Option<&ContractQuote> {
        self.at(strike, OptionType::Call)
    }

    pub fn put_at(&self, strike: f64) -> Option<&ContractQuote> {
        self.at(strike, OptionType::Put)
    }

    fn at(&self, strike: f64, option_type: OptionType) -> Option<&ContractQuote> {
        self.contracts
            .iter()
            .find(|c| c.option_type == option_type && (c.strike - strike).abs() < 1e-9)
    }

    /// Distinct strikes in ascending order.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = Vec::new();
        for contract in &self.contracts {
            if !strikes.iter().any(|s| (s - contract.strike).abs() < 1e-9) {
                strikes.push(contract.strike);
            }
        }
        strikes.sort_by(|a, b| a.total_cmp(b));
        strikes
    }
}

/// Annualized historical volatility estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolEstimate {
    pub symbol: Symbol,
    pub window_days: u32,
    pub annualized: f64,
    pub as_of: UtcDateTime,
    pub provider: ProviderId,
}

impl VolEstimate {
    pub fn new(
        symbol: Symbol,
        window_days: u32,
        annualized: f64,
        as_of: UtcDateTime,
        provider: ProviderId,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("annualized", annualized)?;
        Ok(Self {
            symbol,
            window_days,
            annualized,
            as_of,
            provider,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field, value });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field, value });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(spot: f64) -> Result<MarketQuote, ValidationError> {
        MarketQuote::new(
            Symbol::parse("AAPL").expect("symbol"),
            spot,
            0.05,
            0.0,
            0.25,
            UtcDateTime::parse("2026-01-02T00:00:00Z").expect("timestamp"),
            ProviderId::Yahoo,
            None,
            None,
        )
    }

    #[test]
    fn rejects_negative_spot() {
        let err = quote(-1.0).expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "spot", .. }));
    }

    #[test]
    fn allows_negative_rate_and_yield() {
        let quote = MarketQuote::new(
            Symbol::parse("SAP").expect("symbol"),
            100.0,
            -0.005,
            -0.01,
            0.2,
            UtcDateTime::parse("2026-01-02T00:00:00Z").expect("timestamp"),
            ProviderId::Polygon,
            None,
            None,
        );
        assert!(quote.is_ok());
    }

    #[test]
    fn rejects_non_positive_strike() {
        let err = OptionContract::new(
            Symbol::parse("AAPL").expect("symbol"),
            0.0,
            ExpiryDate::parse("2026-06-19").expect("date"),
            OptionType::Call,
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::NonPositiveValue { field: "strike", .. }
        ));
    }

    #[test]
    fn intrinsic_values() {
        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(110.0, 100.0), 0.0);
    }

    #[test]
    fn best_price_prefers_mid_over_last() {
        let row = ContractQuote::new(
            100.0,
            OptionType::Call,
            Some(4.8),
            Some(5.2),
            Some(4.0),
            None,
            None,
            None,
        )
        .expect("row");
        assert_eq!(row.best_price(), Some(5.0));

        let stale = ContractQuote::new(
            100.0,
            OptionType::Call,
            None,
            None,
            Some(4.0),
            None,
            None,
            None,
        )
        .expect("row");
        assert_eq!(stale.best_price(), Some(4.0));
    }

    #[test]
    fn chain_lookup_by_strike_and_type() {
        let contracts = vec![
            ContractQuote::new(95.0, OptionType::Call, None, None, Some(7.0), None, None, None)
                .expect("row"),
            ContractQuote::new(95.0, OptionType::Put, None, None, Some(2.0), None, None, None)
                .expect("row"),
            ContractQuote::new(100.0, OptionType::Call, None, None, Some(4.0), None, None, None)
                .expect("row"),
        ];
        let chain = OptionChain::new(
            Symbol::parse("MSFT").expect("symbol"),
            ExpiryDate::parse("2026-06-19").expect("date"),
            97.5,
            UtcDateTime::parse("2026-01-02T00:00:00Z").expect("timestamp"),
            ProviderId::Yahoo,
            contracts,
        )
        .expect("chain");

        assert!(chain.call_at(95.0).is_some());
        assert!(chain.put_at(100.0).is_none());
        assert_eq!(chain.strikes(), vec![95.0, 100.0]);
    }
}
