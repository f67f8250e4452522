//! Provider trait and request/response types.
//!
//! This module defines the adapter contract ([`MarketDataSource`]) that all
//! provider implementations follow, along with the request types for each
//! endpoint.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Spot | [`SpotRequest`] | [`MarketQuote`] | Underlying spot snapshot |
//! | Chain | [`ChainRequest`] | [`OptionChain`] | Option chain for one expiry |
//! | HistVol | [`HistVolRequest`] | [`VolEstimate`] | Annualized historical volatility |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{
    ExpiryDate, MarketQuote, OptionChain, ProviderId, Symbol, ValidationError, VolEstimate,
};

/// Data endpoint type used for routing, caching, and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Spot,
    Chain,
    HistVol,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Chain => "chain",
            Self::HistVol => "hist_vol",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub spot: bool,
    pub chain: bool,
    pub hist_vol: bool,
}

impl CapabilitySet {
    pub const fn new(spot: bool, chain: bool, hist_vol: bool) -> Self {
        Self {
            spot,
            chain,
            hist_vol,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Spot => self.spot,
            Endpoint::Chain => self.chain,
            Endpoint::HistVol => self.hist_vol,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(3);
        if self.spot {
            values.push("spot");
        }
        if self.chain {
            values.push("chain");
        }
        if self.hist_vol {
            values.push("hist_vol");
        }
        values
    }
}

/// Health state reported by providers and shown by the `sources` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime provider health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }

    pub const fn degraded() -> Self {
        Self::new(HealthState::Degraded, true)
    }
}

/// Adapter-level error classification.
///
/// The router treats `Unavailable` and `RateLimited` as transient (retry,
/// then fall through to the next provider); everything else is fatal for
/// the provider and skips straight to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    UnsupportedEndpoint,
    Unavailable,
    RateLimited,
    InvalidRequest,
    AuthFailed,
    NotFound,
    MalformedPayload,
    AdapterNotRegistered,
    Internal,
}

/// Structured provider error used by router fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: ProviderErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this provider"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::AuthFailed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: ProviderErrorKind::AdapterNotRegistered,
            message: format!("provider adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the router should retry this provider before moving on.
    pub const fn is_transient(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::UnsupportedEndpoint => "provider.unsupported_endpoint",
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::AuthFailed => "provider.auth_failed",
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::MalformedPayload => "provider.malformed_payload",
            ProviderErrorKind::AdapterNotRegistered => "provider.adapter_not_registered",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Request payload for the spot endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotRequest {
    pub symbol: Symbol,
}

impl SpotRequest {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

/// Request payload for the chain endpoint.
///
/// `expiry` of `None` means the nearest listed expiry; adapters resolve it
/// and report the concrete date in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    pub symbol: Symbol,
    pub expiry: Option<ExpiryDate>,
}

impl ChainRequest {
    pub fn new(symbol: Symbol, expiry: Option<ExpiryDate>) -> Self {
        Self { symbol, expiry }
    }
}

/// Request payload for the historical-volatility endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistVolRequest {
    pub symbol: Symbol,
    pub window_days: u32,
}

impl HistVolRequest {
    pub fn new(symbol: Symbol, window_days: u32) -> Result<Self, ProviderError> {
        if !(2..=730).contains(&window_days) {
            let cause = ValidationError::InvalidVolatilityWindow { value: window_days };
            return Err(ProviderError::invalid_request(cause.to_string()));
        }
        Ok(Self {
            symbol,
            window_days,
        })
    }
}

/// Provider adapter contract.
///
/// All market-data providers implement this trait to be used with the
/// router. The trait uses async methods returning boxed futures so adapters
/// can be held as trait objects.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as they may be shared across tasks.
pub trait MarketDataSource: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Supported endpoint matrix.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetches a normalized spot snapshot for the underlying.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the endpoint is unsupported, the
    /// provider is unavailable or rate limited, or the payload cannot be
    /// normalized.
    fn spot<'a>(
        &'a self,
        req: SpotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketQuote, ProviderError>> + Send + 'a>>;

    /// Fetches a normalized option chain for one expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the endpoint is unsupported or the
    /// requested expiry is not listed.
    fn chain<'a>(
        &'a self,
        req: ChainRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OptionChain, ProviderError>> + Send + 'a>>;

    /// Computes annualized historical volatility from daily closes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the endpoint is unsupported or there
    /// is not enough history to fill the window.
    fn hist_vol<'a>(
        &'a self,
        req: HistVolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<VolEstimate, ProviderError>> + Send + 'a>>;

    /// Current health snapshot, used by the `sources` command.
    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_follows_kind() {
        assert!(ProviderError::unavailable("timeout").is_transient());
        assert!(ProviderError::rate_limited("429").is_transient());
        assert!(!ProviderError::auth_failed("401").is_transient());
        assert!(!ProviderError::malformed_payload("bad json").is_transient());
    }

    #[test]
    fn hist_vol_request_bounds_window() {
        let symbol = Symbol::parse("AAPL").expect("symbol");
        assert!(HistVolRequest::new(symbol.clone(), 30).is_ok());

        let error = HistVolRequest::new(symbol.clone(), 1).expect_err("window too short");
        assert_eq!(error.kind(), ProviderErrorKind::InvalidRequest);
        assert_eq!(
            error.message(),
            ValidationError::InvalidVolatilityWindow { value: 1 }.to_string()
        );
        assert!(HistVolRequest::new(symbol, 731).is_err());
    }

    #[test]
    fn capability_set_reports_supported_endpoints() {
        let caps = CapabilitySet::new(true, false, true);
        assert!(caps.supports(Endpoint::Spot));
        assert!(!caps.supports(Endpoint::Chain));
        assert_eq!(caps.supported_endpoints(), vec!["spot", "hist_vol"]);
    }
}
