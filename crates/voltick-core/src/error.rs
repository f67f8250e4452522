use thiserror::Error;

/// Validation and contract errors exposed by `voltick-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid provider '{value}', expected one of yahoo, polygon, alpaca")]
    InvalidProvider { value: String },
    #[error("invalid option type '{value}', expected 'call' or 'put'")]
    InvalidOptionType { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("expiry must be a calendar date (YYYY-MM-DD): '{value}'")]
    InvalidExpiryDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative, got {value}")]
    NegativeValue { field: &'static str, value: f64 },
    #[error("field '{field}' must be positive, got {value}")]
    NonPositiveValue { field: &'static str, value: f64 },

    #[error("historical volatility window must be between 2 and 730 days, got {value}")]
    InvalidVolatilityWindow { value: u32 },

    #[error("request id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema version must look like 'v1.0.0': '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("envelope source chain cannot be empty")]
    EmptySourceChain,
    #[error("envelope error code cannot be empty")]
    EmptyErrorCode,
    #[error("envelope error message cannot be empty")]
    EmptyErrorMessage,
}
