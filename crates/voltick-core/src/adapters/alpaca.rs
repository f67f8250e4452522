use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{annualized_vol, status_to_error, symbol_seed, validation_to_error, DEFAULT_RISK_FREE_RATE};
use crate::http::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    CapabilitySet, ChainRequest, Endpoint, HealthState, HealthStatus, HistVolRequest,
    MarketDataSource, ProviderError, SpotRequest,
};
use crate::throttle::{ProviderPolicy, RateGate};
use crate::{MarketQuote, OptionChain, ProviderId, Symbol, UtcDateTime, VolEstimate};

/// Environment variable holding the Alpaca paper API key id.
pub const ALPACA_KEY_ENV: &str = "ALPACA_PAPER_API_KEY";
/// Environment variable holding the Alpaca paper API secret.
pub const ALPACA_SECRET_ENV: &str = "ALPACA_PAPER_SECRET_KEY";

/// Alpaca paper-data adapter.
///
/// Serves spot and historical volatility; the stock data API exposes no
/// option chains, so the chain endpoint is unsupported and the router
/// skips this provider for chain requests.
#[derive(Clone)]
pub struct AlpacaAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    api_secret: String,
    gate: RateGate,
    health_state: HealthState,
    rate_available: bool,
}

impl Default for AlpacaAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            api_key: String::from("offline-key"),
            api_secret: String::from("offline-secret"),
            gate: RateGate::from_policy(&ProviderPolicy::alpaca_default()),
            health_state: HealthState::Healthy,
            rate_available: true,
        }
    }
}

impl AlpacaAdapter {
    pub fn with_http_client(
        http_client: Arc<dyn HttpClient>,
        api_key: String,
        api_secret: String,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_secret,
            ..Self::default()
        }
    }

    /// Reads paper credentials from the environment. Errors when the
    /// transport is real and either variable is absent.
    pub fn from_env(http_client: Arc<dyn HttpClient>) -> Result<Self, ProviderError> {
        if http_client.is_mock() {
            return Ok(Self::with_http_client(
                http_client,
                String::from("offline-key"),
                String::from("offline-secret"),
            ));
        }
        let api_key = std::env::var(ALPACA_KEY_ENV)
            .map_err(|_| ProviderError::auth_failed(format!("{ALPACA_KEY_ENV} is not set")))?;
        let api_secret = std::env::var(ALPACA_SECRET_ENV)
            .map_err(|_| ProviderError::auth_failed(format!("{ALPACA_SECRET_ENV} is not set")))?;
        Ok(Self::with_http_client(http_client, api_key, api_secret))
    }

    pub fn with_health(health_state: HealthState, rate_available: bool) -> Self {
        Self {
            health_state,
            rate_available,
            ..Self::default()
        }
    }

    fn is_real_client(&self) -> bool {
        !self.http_client.is_mock()
    }

    fn acquire_budget(&self) -> Result<(), ProviderError> {
        if self.gate.try_acquire() {
            Ok(())
        } else {
            Err(ProviderError::rate_limited(
                "alpaca local rate budget exhausted",
            ))
        }
    }

    async fn execute(&self, endpoint: &str) -> Result<String, ProviderError> {
        let request = HttpRequest::get(endpoint)
            .with_header("apca-api-key-id", self.api_key.clone())
            .with_header("apca-api-secret-key", self.api_secret.clone())
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                ProviderError::unavailable(format!("alpaca transport error: {}", e.message()))
            } else {
                ProviderError::internal(format!("alpaca transport error: {}", e.message()))
            }
        })?;

        if !response.is_success() {
            return Err(status_to_error("alpaca", response.status));
        }

        Ok(response.body)
    }
}

impl MarketDataSource for AlpacaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alpaca
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, true)
    }

    fn spot<'a>(
        &'a self,
        req: SpotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketQuote, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            self.acquire_budget()?;
            if self.is_real_client() {
                self.fetch_real_spot(&req).await
            } else {
                self.fetch_fake_spot(&req).await
            }
        })
    }

    fn chain<'a>(
        &'a self,
        req: ChainRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OptionChain, ProviderError>> + Send + 'a>> {
        let _ = req;
        Box::pin(async move { Err(ProviderError::unsupported_endpoint(Endpoint::Chain)) })
    }

    fn hist_vol<'a>(
        &'a self,
        req: HistVolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<VolEstimate, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            self.acquire_budget()?;
            if self.is_real_client() {
                self.fetch_real_hist_vol(&req).await
            } else {
                self.fetch_fake_hist_vol(&req).await
            }
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { HealthStatus::new(self.health_state, self.rate_available) })
    }
}

// Real API calls.
impl AlpacaAdapter {
    async fn fetch_real_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        let endpoint = format!(
            "https://data.alpaca.markets/v2/stocks/{}/snapshot",
            urlencoding::encode(req.symbol.as_str()),
        );
        let body = self.execute(&endpoint).await?;

        let parsed: AlpacaSnapshotResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse alpaca snapshot: {e}"))
        })?;

        let spot = parsed
            .latest_trade
            .as_ref()
            .map(|t| t.price)
            .or_else(|| parsed.daily_bar.as_ref().map(|b| b.close))
            .ok_or_else(|| ProviderError::malformed_payload("alpaca snapshot has no trade price"))?;

        let (bid, ask) = parsed
            .latest_quote
            .map(|q| (positive(q.bid_price), positive(q.ask_price)))
            .unwrap_or((None, None));

        MarketQuote::new(
            req.symbol.clone(),
            spot,
            DEFAULT_RISK_FREE_RATE,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Alpaca,
            bid,
            ask,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_real_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        let endpoint = format!(
            "https://data.alpaca.markets/v2/stocks/{}/bars?timeframe=1Day&limit={}",
            urlencoding::encode(req.symbol.as_str()),
            req.window_days + 1,
        );
        let body = self.execute(&endpoint).await?;

        let parsed: AlpacaBarsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse alpaca bars: {e}"))
        })?;

        let closes: Vec<f64> = parsed.bars.iter().map(|bar| bar.close).collect();
        let annualized = annualized_vol(&closes).ok_or_else(|| {
            ProviderError::not_found(format!(
                "alpaca returned {} bars, not enough for a {}-day window",
                closes.len(),
                req.window_days
            ))
        })?;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Alpaca,
        )
        .map_err(validation_to_error)
    }
}

// Deterministic offline data.
impl AlpacaAdapter {
    async fn fetch_fake_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        self.execute("https://data.alpaca.markets/v2/stocks").await?;
        let spot = fake_trade_price(&req.symbol);
        MarketQuote::new(
            req.symbol.clone(),
            spot,
            DEFAULT_RISK_FREE_RATE,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Alpaca,
            Some(spot - 0.03),
            Some(spot + 0.03),
        )
        .map_err(validation_to_error)
    }

    async fn fetch_fake_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        self.execute("https://data.alpaca.markets/v2/stocks").await?;

        let seed = symbol_seed(&req.symbol);
        let annualized = 0.19 + (seed % 22) as f64 / 100.0;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Alpaca,
        )
        .map_err(validation_to_error)
    }
}

fn fake_trade_price(symbol: &Symbol) -> f64 {
    92.3 + (symbol_seed(symbol) % 500) as f64 / 10.0
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

// Alpaca API response structures.
#[derive(Debug, Clone, Deserialize)]
struct AlpacaSnapshotResponse {
    #[serde(rename = "latestTrade", default)]
    latest_trade: Option<AlpacaTrade>,
    #[serde(rename = "latestQuote", default)]
    latest_quote: Option<AlpacaQuote>,
    #[serde(rename = "dailyBar", default)]
    daily_bar: Option<AlpacaBar>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlpacaTrade {
    #[serde(rename = "p")]
    price: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct AlpacaQuote {
    #[serde(rename = "bp")]
    bid_price: f64,
    #[serde(rename = "ap")]
    ask_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct AlpacaBarsResponse {
    #[serde(default)]
    bars: Vec<AlpacaBar>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlpacaBar {
    #[serde(rename = "c")]
    close: f64,
}
