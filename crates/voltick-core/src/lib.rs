//! # Voltick Core
//!
//! Market data abstraction for the voltick options toolkit.
//!
//! ## Overview
//!
//! This crate provides the data side of voltick:
//!
//! - **Canonical domain models** for spot quotes, option chains, and
//!   volatility estimates
//! - **Provider adapters** for Yahoo Finance, Polygon.io, and Alpaca
//! - **A routing engine** with cache-first fetches, transient retry, and
//!   ordered provider fallback
//! - **Response envelope** with metadata and structured errors
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo, Polygon, Alpaca) |
//! | [`cache`] | Typed response cache keyed by request signature |
//! | [`domain`] | Domain models (MarketQuote, OptionChain, VolEstimate) |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http`] | HTTP client abstraction |
//! | [`provider`] | Provider trait and request/response types |
//! | [`retry`] | Retry backoff for transient failures |
//! | [`routing`] | Provider registry and fallback routing |
//! | [`source`] | Provider identifiers |
//! | [`throttle`] | Per-provider rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use voltick_core::{QuoteRouterBuilder, SpotRequest, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = QuoteRouterBuilder::new().offline().build();
//!
//!     let request = SpotRequest::new(Symbol::parse("AAPL")?);
//!     let success = router.route_spot(&request).await?;
//!
//!     println!("{}: ${:.2} via {}", success.data.symbol, success.data.spot, success.provider);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Adapter errors carry a kind and a transient flag; the router retries
//! transient failures per provider and skips fatal ones:
//!
//! ```rust
//! use voltick_core::{ProviderError, ProviderErrorKind};
//!
//! fn handle_error(error: ProviderError) {
//!     match error.kind() {
//!         ProviderErrorKind::RateLimited | ProviderErrorKind::Unavailable => {
//!             // Retry, then fall through to the next provider
//!         }
//!         ProviderErrorKind::AuthFailed => {
//!             // Fatal for this provider; skip it
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only (never logged)
//! - Input validation on all domain types

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http;
pub mod provider;
pub mod retry;
pub mod routing;
pub mod source;
pub mod throttle;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{AlpacaAdapter, PolygonAdapter, YahooAdapter, DEFAULT_RISK_FREE_RATE};

// Caching
pub use cache::{CachedValue, Clock, ManualClock, QuoteCache, QuoteKey, SystemClock};

// Domain models
pub use domain::{
    ContractQuote, ExpiryDate, MarketQuote, OptionChain, OptionContract, OptionType, Symbol,
    UtcDateTime, VolEstimate,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::ValidationError;

// HTTP client types
pub use http::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Provider trait and types
pub use provider::{
    CapabilitySet, ChainRequest, Endpoint, HealthState, HealthStatus, HistVolRequest,
    MarketDataSource, ProviderError, ProviderErrorKind, SpotRequest,
};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Routing types
pub use routing::{
    ProviderFailure, QuoteRouter, QuoteRouterBuilder, RouteSuccess, RouterConfig, RouterError,
    SourceSnapshot,
};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttle::{ProviderPolicy, RateGate};
