//! # Voltick Pricing
//!
//! Analytics for the voltick options toolkit: Black-Scholes-Merton
//! pricing with continuous dividend yield, analytic Greeks, a bracketed
//! implied-volatility solver, and multi-leg strategy evaluation.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`black_scholes`] | Prices and Greeks for vanilla European options |
//! | [`error`] | Pricing error types |
//! | [`math`] | Normal distribution helpers |
//! | [`result`] | Structured and flat pricing outputs |
//! | [`solver`] | Implied-volatility solver (Newton with bisection safeguard) |
//! | [`strategy`] | Payoff curves, net Greeks, breakevens for leg combinations |
//!
//! ## Quick Start
//!
//! ```rust
//! use voltick_core::OptionType;
//! use voltick_pricing::{price, solve, PricingInputs};
//!
//! fn main() -> Result<(), voltick_pricing::PricingError> {
//!     let inputs = PricingInputs::new(100.0, 100.0, 0.05, 0.0, 0.20, 1.0, OptionType::Call)?;
//!     let premium = price(&inputs);
//!
//!     let solution = solve(premium, &inputs)?;
//!     assert!(solution.converged);
//!     assert!((solution.sigma - 0.20).abs() < 1e-4);
//!     Ok(())
//! }
//! ```
//!
//! ## Conventions
//!
//! - Theta and rho are per year, vega is per unit of volatility.
//! - Expired contracts (T ≤ 0) and zero volatility are defined values,
//!   never errors; only malformed inputs are.
//! - Puts are priced through put-call parity off the call formula, so
//!   parity holds to machine precision by construction.

pub mod black_scholes;
pub mod error;
pub mod math;
pub mod result;
pub mod solver;
pub mod strategy;

pub use black_scholes::{greeks, price, Greeks, PricingInputs};
pub use error::PricingError;
pub use result::{PricingRecord, PricingResult, SolverDiagnostics};
pub use solver::{solve, solve_with, IvSolution, SolverConfig, SolverMethod};
pub use strategy::{
    evaluate, linear_grid, Direction, LegInstrument, PayoffBound, PayoffPoint, Strategy,
    StrategyEvaluation, StrategyLeg,
};
