//! Pricing output types.
//!
//! `PricingResult` keeps the structured inputs alongside the outputs;
//! `PricingRecord` is the flat, serialization-friendly projection used
//! by CLI output and anything tabular.

use serde::{Deserialize, Serialize};
use voltick_core::{ExpiryDate, MarketQuote, OptionContract, OptionType};

use crate::black_scholes::Greeks;
use crate::solver::{IvSolution, SolverMethod};

/// How an implied-volatility estimate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    pub iterations: u32,
    pub converged: bool,
    pub method: SolverMethod,
}

impl From<IvSolution> for SolverDiagnostics {
    fn from(solution: IvSolution) -> Self {
        Self {
            iterations: solution.iterations,
            converged: solution.converged,
            method: solution.method,
        }
    }
}

/// A priced contract with its market context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub contract: OptionContract,
    pub quote: MarketQuote,
    pub price: f64,
    pub greeks: Greeks,
    pub solver: Option<SolverDiagnostics>,
}

impl PricingResult {
    /// Expiry spot at which the position breaks even against the
    /// theoretical premium: K + premium for calls, K − premium for puts.
    pub fn breakeven(&self) -> f64 {
        self.contract.strike + self.contract.option_type.parity_sign() * self.price
    }

    /// Flattens to one serializable row.
    pub fn to_record(&self) -> PricingRecord {
        PricingRecord {
            symbol: self.contract.symbol.to_string(),
            option_type: self.contract.option_type,
            strike: self.contract.strike,
            expiry: self.contract.expiry,
            spot: self.quote.spot,
            rate: self.quote.risk_free_rate,
            dividend_yield: self.quote.dividend_yield,
            volatility: self.quote.volatility,
            price: self.price,
            breakeven: self.breakeven(),
            delta: self.greeks.delta,
            gamma: self.greeks.gamma,
            vega: self.greeks.vega,
            theta: self.greeks.theta,
            rho: self.greeks.rho,
            solver_iterations: self.solver.map(|s| s.iterations),
            solver_converged: self.solver.map(|s| s.converged),
            solver_method: self.solver.map(|s| s.method),
        }
    }
}

/// Flat pricing row. Every field serializes to a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub symbol: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiry: ExpiryDate,
    pub spot: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub volatility: f64,
    pub price: f64,
    pub breakeven: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_converged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_method: Option<SolverMethod>,
}
