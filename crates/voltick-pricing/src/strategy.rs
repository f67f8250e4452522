//! Multi-leg strategy evaluation: expiry payoff curve, net Greeks,
//! breakevens, and bounded/unbounded profit extremes.

use serde::{Deserialize, Serialize};
use voltick_core::{ExpiryDate, MarketQuote, OptionContract, OptionType};

use crate::black_scholes::{greeks, Greeks, PricingInputs};
use crate::error::PricingError;

/// Position side of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub const fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// What a leg holds: a vanilla option or the underlying itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LegInstrument {
    Option(OptionContract),
    Underlying,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub instrument: LegInstrument,
    pub direction: Direction,
    pub quantity: u32,
}

impl StrategyLeg {
    fn signed_quantity(&self) -> f64 {
        self.direction.sign() * f64::from(self.quantity)
    }

    /// Leg value at expiry for a terminal underlying price.
    fn value_at_expiry(&self, underlying: f64) -> f64 {
        match &self.instrument {
            LegInstrument::Option(contract) => contract
                .option_type
                .intrinsic(underlying, contract.strike),
            LegInstrument::Underlying => underlying,
        }
    }

    /// ∂value/∂underlying in the limit underlying → ∞.
    fn terminal_slope(&self) -> f64 {
        match &self.instrument {
            LegInstrument::Option(contract) => match contract.option_type {
                OptionType::Call => 1.0,
                OptionType::Put => 0.0,
            },
            LegInstrument::Underlying => 1.0,
        }
    }
}

/// An ordered set of legs entered for a net cost.
///
/// `entry_cost` is the signed cash paid to open the position: positive
/// for a net debit, negative for a net credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub legs: Vec<StrategyLeg>,
    pub entry_cost: f64,
}

impl Strategy {
    pub fn new(
        name: Option<String>,
        legs: Vec<StrategyLeg>,
        entry_cost: f64,
    ) -> Result<Self, PricingError> {
        if legs.is_empty() {
            return Err(PricingError::InvalidInput(
                "strategy must have at least one leg".to_owned(),
            ));
        }
        if let Some(position) = legs.iter().position(|leg| leg.quantity == 0) {
            return Err(PricingError::InvalidInput(format!(
                "leg {position} has zero quantity"
            )));
        }
        if !entry_cost.is_finite() {
            return Err(PricingError::InvalidInput(format!(
                "entry cost must be finite, got {entry_cost}"
            )));
        }
        Ok(Self {
            name,
            legs,
            entry_cost,
        })
    }

    /// Net position P&L at expiry for a terminal underlying price.
    pub fn payoff_at(&self, underlying: f64) -> f64 {
        let gross: f64 = self
            .legs
            .iter()
            .map(|leg| leg.signed_quantity() * leg.value_at_expiry(underlying))
            .sum();
        gross - self.entry_cost
    }

    fn net_terminal_slope(&self) -> f64 {
        self.legs
            .iter()
            .map(|leg| leg.signed_quantity() * leg.terminal_slope())
            .sum()
    }
}

/// One point of the expiry payoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffPoint {
    pub underlying: f64,
    pub value: f64,
}

/// A profit extreme that may not exist as a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoffBound {
    Finite(f64),
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEvaluation {
    pub payoff_curve: Vec<PayoffPoint>,
    pub net_greeks: Greeks,
    pub breakevens: Vec<f64>,
    pub max_gain: PayoffBound,
    pub max_loss: PayoffBound,
}

/// Builds an ascending evenly spaced price grid with `steps` intervals.
pub fn linear_grid(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, PricingError> {
    if !(min.is_finite() && max.is_finite()) || min < 0.0 || max <= min || steps == 0 {
        return Err(PricingError::InvalidInput(format!(
            "grid must satisfy 0 <= min < max with at least one step, got [{min}, {max}] x {steps}"
        )));
    }
    let width = (max - min) / steps as f64;
    Ok((0..=steps).map(|i| min + i as f64 * width).collect())
}

/// Evaluates a strategy against a market snapshot over an ascending
/// price grid.
///
/// The payoff curve is the position P&L at expiry. Net Greeks are the
/// linear combination of per-leg Greeks at the current spot, priced off
/// the quote's rate, yield, and volatility; an underlying leg
/// contributes delta only. Breakevens are linearly interpolated zero
/// crossings of the curve. A nonzero net slope past the right grid edge
/// marks the corresponding extreme as unbounded; the left edge is
/// always finite since the underlying cannot fall below zero.
pub fn evaluate(
    strategy: &Strategy,
    quote: &MarketQuote,
    price_grid: &[f64],
) -> Result<StrategyEvaluation, PricingError> {
    if price_grid.len() < 2 {
        return Err(PricingError::InvalidInput(
            "price grid needs at least two points".to_owned(),
        ));
    }
    if price_grid
        .windows(2)
        .any(|pair| !(pair[0].is_finite() && pair[1].is_finite()) || pair[0] >= pair[1])
    {
        return Err(PricingError::InvalidInput(
            "price grid must be finite and strictly ascending".to_owned(),
        ));
    }
    if price_grid[0] < 0.0 {
        return Err(PricingError::InvalidInput(
            "price grid cannot include negative underlying prices".to_owned(),
        ));
    }

    let payoff_curve: Vec<PayoffPoint> = price_grid
        .iter()
        .map(|&underlying| PayoffPoint {
            underlying,
            value: strategy.payoff_at(underlying),
        })
        .collect();

    let net_greeks = net_greeks(strategy, quote)?;
    let breakevens = breakevens(&payoff_curve);

    let slope = strategy.net_terminal_slope();
    // Extreme candidates: every grid value plus the exact value at S = 0.
    let floor_value = strategy.payoff_at(0.0);
    let mut highest = floor_value;
    let mut lowest = floor_value;
    for point in &payoff_curve {
        highest = highest.max(point.value);
        lowest = lowest.min(point.value);
    }

    let max_gain = if slope > f64::EPSILON {
        PayoffBound::Unbounded
    } else {
        PayoffBound::Finite(highest)
    };
    let max_loss = if slope < -f64::EPSILON {
        PayoffBound::Unbounded
    } else {
        PayoffBound::Finite(lowest)
    };

    Ok(StrategyEvaluation {
        payoff_curve,
        net_greeks,
        breakevens,
        max_gain,
        max_loss,
    })
}

fn net_greeks(strategy: &Strategy, quote: &MarketQuote) -> Result<Greeks, PricingError> {
    if quote.spot <= 0.0 {
        return Err(PricingError::InvalidInput(format!(
            "spot must be positive to aggregate Greeks, got {}",
            quote.spot
        )));
    }
    let valuation = ExpiryDate::from_date(quote.as_of.date());

    let mut net = Greeks::default();
    for leg in &strategy.legs {
        let leg_greeks = match &leg.instrument {
            LegInstrument::Option(contract) => option_greeks(contract, quote, valuation)?,
            LegInstrument::Underlying => Greeks {
                delta: 1.0,
                ..Greeks::default()
            },
        };
        net = net.add(leg_greeks.scaled(leg.signed_quantity()));
    }
    Ok(net)
}

fn option_greeks(
    contract: &OptionContract,
    quote: &MarketQuote,
    valuation: ExpiryDate,
) -> Result<Greeks, PricingError> {
    let inputs = PricingInputs::new(
        quote.spot,
        contract.strike,
        quote.risk_free_rate,
        quote.dividend_yield,
        quote.volatility,
        contract.time_to_expiry(valuation),
        contract.option_type,
    )?;
    Ok(greeks(&inputs))
}

fn breakevens(curve: &[PayoffPoint]) -> Vec<f64> {
    let mut crossings = Vec::new();
    for pair in curve.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if left.value == 0.0 {
            crossings.push(left.underlying);
        } else if left.value * right.value < 0.0 {
            let fraction = left.value / (left.value - right.value);
            crossings.push(left.underlying + fraction * (right.underlying - left.underlying));
        }
    }
    if let Some(last) = curve.last() {
        if last.value == 0.0 {
            crossings.push(last.underlying);
        }
    }
    crossings
}
