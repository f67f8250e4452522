use thiserror::Error;

/// Errors surfaced by pricing, solving, and strategy evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("market price {price} violates no-arbitrage bounds [{lower}, {upper}]")]
    ArbitrageViolation { price: f64, lower: f64, upper: f64 },
}
