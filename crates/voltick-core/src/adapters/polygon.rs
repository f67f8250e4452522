use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{
    annualized_vol, status_to_error, symbol_seed, validation_to_error, DEFAULT_RISK_FREE_RATE,
};
use crate::http::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    CapabilitySet, ChainRequest, HealthState, HealthStatus, HistVolRequest, MarketDataSource,
    ProviderError, SpotRequest,
};
use crate::throttle::{ProviderPolicy, RateGate};
use crate::{
    ContractQuote, ExpiryDate, MarketQuote, OptionChain, OptionType, ProviderId, Symbol,
    UtcDateTime, VolEstimate,
};

/// Environment variable holding the Polygon API key.
pub const POLYGON_API_KEY_ENV: &str = "POLYGON_API_KEY";

/// Polygon.io adapter.
///
/// Authenticates with an `apiKey` query parameter. Free-tier data is
/// end-of-day, so spot comes from the previous close aggregate.
#[derive(Clone)]
pub struct PolygonAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    gate: RateGate,
    health_state: HealthState,
    rate_available: bool,
}

impl Default for PolygonAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            auth: HttpAuth::QueryParam {
                name: String::from("apiKey"),
                value: String::from("offline-key"),
            },
            gate: RateGate::from_policy(&ProviderPolicy::polygon_default()),
            health_state: HealthState::Healthy,
            rate_available: true,
        }
    }
}

impl PolygonAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: String) -> Self {
        Self {
            http_client,
            auth: HttpAuth::QueryParam {
                name: String::from("apiKey"),
                value: api_key,
            },
            ..Self::default()
        }
    }

    /// Reads the API key from `POLYGON_API_KEY`. Errors when the transport
    /// is real and the key is absent.
    pub fn from_env(http_client: Arc<dyn HttpClient>) -> Result<Self, ProviderError> {
        if http_client.is_mock() {
            return Ok(Self::with_http_client(http_client, String::from("offline-key")));
        }
        let api_key = std::env::var(POLYGON_API_KEY_ENV).map_err(|_| {
            ProviderError::auth_failed(format!("{POLYGON_API_KEY_ENV} is not set"))
        })?;
        Ok(Self::with_http_client(http_client, api_key))
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
                "polygon local rate budget exhausted (free tier is 5/min)",
            ))
        }
    }

    async fn execute(&self, endpoint: &str) -> Result<String, ProviderError> {
        let request = HttpRequest::get(endpoint)
            .with_auth(&self.auth)
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                ProviderError::unavailable(format!("polygon transport error: {}", e.message()))
            } else {
                ProviderError::internal(format!("polygon transport error: {}", e.message()))
            }
        })?;

        if !response.is_success() {
            return Err(status_to_error("polygon", response.status));
        }

        Ok(response.body)
    }
}

impl MarketDataSource for PolygonAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Polygon
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
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
        Box::pin(async move {
            self.acquire_budget()?;
            if self.is_real_client() {
                self.fetch_real_chain(&req).await
            } else {
                self.fetch_fake_chain(&req).await
            }
        })
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
impl PolygonAdapter {
    async fn fetch_real_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        let endpoint = format!(
            "https://api.polygon.io/v2/aggs/ticker/{}/prev?adjusted=true",
            urlencoding::encode(req.symbol.as_str()),
        );
        let body = self.execute(&endpoint).await?;

        let parsed: PolygonAggsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse polygon aggregates: {e}"))
        })?;

        let bar = parsed
            .results
            .first()
            .ok_or_else(|| ProviderError::not_found("polygon returned no previous close"))?;

        MarketQuote::new(
            req.symbol.clone(),
            bar.close,
            DEFAULT_RISK_FREE_RATE,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Polygon,
            None,
            None,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_real_chain(&self, req: &ChainRequest) -> Result<OptionChain, ProviderError> {
        let mut endpoint = format!(
            "https://api.polygon.io/v3/snapshot/options/{}?limit=250",
            urlencoding::encode(req.symbol.as_str()),
        );
        if let Some(expiry) = req.expiry {
            endpoint.push_str(&format!("&expiration_date={}", expiry.format_iso()));
        }
        let body = self.execute(&endpoint).await?;

        let parsed: PolygonSnapshotResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse polygon snapshot: {e}"))
        })?;

        let mut resolved_expiry = req.expiry;
        let mut spot = 0.0;
        let mut contracts = Vec::with_capacity(parsed.results.len());

        for row in &parsed.results {
            let option_type = match row.details.contract_type.as_str() {
                "call" => OptionType::Call,
                "put" => OptionType::Put,
                _ => continue,
            };

            let row_expiry = ExpiryDate::parse(&row.details.expiration_date)
                .map_err(validation_to_error)?;
            match resolved_expiry {
                None => resolved_expiry = Some(row_expiry),
                // Without an expiration filter the snapshot spans expiries;
                // keep only the first one seen (the nearest).
                Some(expiry) if expiry != row_expiry => continue,
                Some(_) => {}
            }

            if let Some(asset) = &row.underlying_asset {
                if let Some(price) = asset.price {
                    spot = price;
                }
            }

            if let Ok(contract) = ContractQuote::new(
                row.details.strike_price,
                option_type,
                row.last_quote.as_ref().and_then(|q| q.bid),
                row.last_quote.as_ref().and_then(|q| q.ask),
                row.day.as_ref().and_then(|d| d.close),
                row.implied_volatility,
                row.day.as_ref().and_then(|d| d.volume),
                row.open_interest,
            ) {
                contracts.push(contract);
            }
        }

        let expiry = resolved_expiry
            .ok_or_else(|| ProviderError::not_found("polygon snapshot has no contracts"))?;

        OptionChain::new(
            req.symbol.clone(),
            expiry,
            spot,
            UtcDateTime::now(),
            ProviderId::Polygon,
            contracts,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_real_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        let today = time::OffsetDateTime::now_utc().date();
        // Twice the window in calendar days covers weekends and holidays.
        let from = today - time::Duration::days(i64::from(req.window_days) * 2 + 7);
        let endpoint = format!(
            "https://api.polygon.io/v2/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=asc&limit=5000",
            urlencoding::encode(req.symbol.as_str()),
            ExpiryDate::from_date(from).format_iso(),
            ExpiryDate::from_date(today).format_iso(),
        );
        let body = self.execute(&endpoint).await?;

        let parsed: PolygonAggsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse polygon aggregates: {e}"))
        })?;

        let closes: Vec<f64> = parsed.results.iter().map(|bar| bar.close).collect();
        let window = req.window_days as usize + 1;
        let tail = if closes.len() > window {
            &closes[closes.len() - window..]
        } else {
            &closes[..]
        };

        let annualized = annualized_vol(tail).ok_or_else(|| {
            ProviderError::not_found(format!(
                "polygon returned {} closes, not enough for a {}-day window",
                closes.len(),
                req.window_days
            ))
        })?;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Polygon,
        )
        .map_err(validation_to_error)
    }
}

// Deterministic offline data.
impl PolygonAdapter {
    async fn fetch_fake_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        self.execute("https://api.polygon.io/v2/aggs/ticker").await?;
        let spot = fake_close(&req.symbol);
        MarketQuote::new(
            req.symbol.clone(),
            spot,
            DEFAULT_RISK_FREE_RATE,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Polygon,
            None,
            None,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_fake_chain(&self, req: &ChainRequest) -> Result<OptionChain, ProviderError> {
        self.execute("https://api.polygon.io/v3/snapshot/options")
            .await?;

        let spot = fake_close(&req.symbol);
        let expiry = req.expiry.unwrap_or_else(|| {
            ExpiryDate::from_date(time::OffsetDateTime::now_utc().date() + time::Duration::days(30))
        });
        let seed = symbol_seed(&req.symbol);
        let base_iv = 0.22 + (seed % 12) as f64 / 100.0;

        let mut contracts = Vec::new();
        for level in 0..9_u32 {
            let strike = ((spot * (0.84 + 0.04 * f64::from(level))) / 2.5).round() * 2.5;
            if strike <= 0.0 {
                continue;
            }
            for option_type in [OptionType::Call, OptionType::Put] {
                let intrinsic = option_type.intrinsic(spot, strike);
                let moneyness = (spot / strike).ln();
                let mid = intrinsic + 0.035 * spot * (-moneyness * moneyness * 8.0).exp();

                let contract = ContractQuote::new(
                    strike,
                    option_type,
                    Some((mid - 0.04).max(0.0)),
                    Some(mid + 0.04),
                    Some(mid),
                    Some(base_iv + moneyness.abs() * 0.08),
                    Some(80 + u64::from(level) * 12),
                    Some(400 + u64::from(level) * 30),
                )
                .map_err(validation_to_error)?;
                contracts.push(contract);
            }
        }

        OptionChain::new(
            req.symbol.clone(),
            expiry,
            spot,
            UtcDateTime::now(),
            ProviderId::Polygon,
            contracts,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_fake_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        self.execute("https://api.polygon.io/v2/aggs/ticker").await?;

        let seed = symbol_seed(&req.symbol);
        let annualized = 0.20 + (seed % 20) as f64 / 100.0;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Polygon,
        )
        .map_err(validation_to_error)
    }
}

fn fake_close(symbol: &Symbol) -> f64 {
    // Slightly offset from the Yahoo synthesis so fallback is observable.
    91.4 + (symbol_seed(symbol) % 500) as f64 / 10.0
}

// Polygon API response structures.
#[derive(Debug, Clone, Deserialize)]
struct PolygonAggsResponse {
    #[serde(default)]
    results: Vec<PolygonAggBar>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonAggBar {
    #[serde(rename = "c")]
    close: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonSnapshotResponse {
    #[serde(default)]
    results: Vec<PolygonSnapshotRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonSnapshotRow {
    details: PolygonContractDetails,
    #[serde(default)]
    last_quote: Option<PolygonLastQuote>,
    #[serde(default)]
    day: Option<PolygonDayStats>,
    #[serde(default)]
    implied_volatility: Option<f64>,
    #[serde(default)]
    open_interest: Option<u64>,
    #[serde(default)]
    underlying_asset: Option<PolygonUnderlyingAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonContractDetails {
    #[serde(rename = "strike_price")]
    strike_price: f64,
    #[serde(rename = "contract_type")]
    contract_type: String,
    #[serde(rename = "expiration_date")]
    expiration_date: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonLastQuote {
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonDayStats {
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolygonUnderlyingAsset {
    #[serde(default)]
    price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    #[test]
    fn offline_spot_differs_from_yahoo_synthesis() {
        let adapter = PolygonAdapter::default();
        let symbol = Symbol::parse("AAPL").expect("symbol");

        let quote = block_on(adapter.spot(SpotRequest::new(symbol))).expect("spot");
        assert_eq!(quote.provider, ProviderId::Polygon);
        assert!(quote.spot > 0.0);
    }

    #[test]
    fn rate_gate_exhaustion_is_transient() {
        let adapter = PolygonAdapter::default();
        let symbol = Symbol::parse("AAPL").expect("symbol");

        // Free-tier gate allows a burst of 5.
        let mut last = None;
        for _ in 0..8 {
            last = Some(block_on(adapter.spot(SpotRequest::new(symbol.clone()))));
        }
        let error = last.expect("ran").expect_err("budget should be exhausted");
        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);
        assert!(error.is_transient());
    }

    #[test]
    fn from_env_with_mock_transport_needs_no_key() {
        let adapter = PolygonAdapter::from_env(Arc::new(NoopHttpClient));
        assert!(adapter.is_ok());
    }

    #[test]
    fn parses_real_snapshot_payload() {
        let body = r#"{
            "results": [{
                "details": {"strike_price": 185.0, "contract_type": "call", "expiration_date": "2026-06-19"},
                "last_quote": {"bid": 6.1, "ask": 6.4},
                "day": {"close": 6.2, "volume": 140},
                "implied_volatility": 0.27,
                "open_interest": 900,
                "underlying_asset": {"price": 187.5}
            }]
        }"#;

        let parsed: PolygonSnapshotResponse = serde_json::from_str(body).expect("must parse");
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].details.contract_type, "call");
        assert_eq!(parsed.results[0].open_interest, Some(900));
    }

    fn block_on<F>(future: F) -> F::Output
    where
        F: Future,
    {
        let waker = noop_waker();
        let mut context = Context::from_waker(&waker);
        let mut future = std::pin::pin!(future);

        loop {
            match future.as_mut().poll(&mut context) {
                Poll::Ready(output) => return output,
                Poll::Pending => std::thread::yield_now(),
            }
        }
    }

    fn noop_waker() -> Waker {
        // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
        unsafe { Waker::from_raw(noop_raw_waker()) }
    }

    fn noop_raw_waker() -> RawWaker {
        RawWaker::new(std::ptr::null(), &NOOP_RAW_WAKER_VTABLE)
    }

    unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
        noop_raw_waker()
    }

    unsafe fn noop_raw_waker_wake(_: *const ()) {}

    unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

    unsafe fn noop_raw_waker_drop(_: *const ()) {}

    static NOOP_RAW_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
        noop_raw_waker_clone,
        noop_raw_waker_wake,
        noop_raw_waker_wake_by_ref,
        noop_raw_waker_drop,
    );
}
