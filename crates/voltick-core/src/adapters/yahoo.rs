use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{
    annualized_vol, status_to_error, symbol_seed, validation_to_error, DEFAULT_RISK_FREE_RATE,
};
use crate::http::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    CapabilitySet, ChainRequest, HealthState, HealthStatus, HistVolRequest, MarketDataSource,
    ProviderError, SpotRequest,
};
use crate::throttle::{ProviderPolicy, RateGate};
use crate::{
    ContractQuote, ExpiryDate, MarketQuote, OptionChain, OptionType, ProviderId, Symbol,
    UtcDateTime, VolEstimate,
};

/// Index ticker quoting the 10-year treasury yield in percent.
const TREASURY_YIELD_SYMBOL: &str = "^TNX";

/// Yahoo Finance adapter.
///
/// Uses the unofficial `query1.finance.yahoo.com` endpoints; no API key,
/// so requests only carry a browser-like referer. Supports all three
/// endpoints, plus a risk-free-rate lookup via the `^TNX` yield index.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    gate: RateGate,
    health_state: HealthState,
    rate_available: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            gate: RateGate::from_policy(&ProviderPolicy::yahoo_default()),
            health_state: HealthState::Healthy,
            rate_available: true,
        }
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            ..Self::default()
        }
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
                "yahoo local rate budget exhausted",
            ))
        }
    }

    async fn execute(&self, endpoint: &str) -> Result<String, ProviderError> {
        let request = HttpRequest::get(endpoint)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await.map_err(|e| {
            if e.retryable() {
                ProviderError::unavailable(format!("yahoo transport error: {}", e.message()))
            } else {
                ProviderError::internal(format!("yahoo transport error: {}", e.message()))
            }
        })?;

        if !response.is_success() {
            return Err(status_to_error("yahoo", response.status));
        }

        Ok(response.body)
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
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
impl YahooAdapter {
    /// Current risk-free rate from the 10-year treasury yield index.
    ///
    /// Falls back to [`DEFAULT_RISK_FREE_RATE`] whenever the lookup cannot
    /// supply a usable yield: offline transport, upstream failure, or an
    /// implausible quote.
    pub async fn risk_free_rate(&self) -> f64 {
        if !self.is_real_client() {
            return DEFAULT_RISK_FREE_RATE;
        }
        self.fetch_treasury_rate()
            .await
            .unwrap_or(DEFAULT_RISK_FREE_RATE)
    }

    async fn fetch_treasury_rate(&self) -> Result<f64, ProviderError> {
        let endpoint = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=1d&interval=1d",
            urlencoding::encode(TREASURY_YIELD_SYMBOL),
        );
        let body = self.execute(&endpoint).await?;

        let parsed: YahooChartResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse yahoo chart: {e}"))
        })?;
        let result = chart_result(&parsed)?;

        let percent = result.meta.regular_market_price.ok_or_else(|| {
            ProviderError::malformed_payload("treasury yield quote has no market price")
        })?;
        if !percent.is_finite() || percent <= 0.0 {
            return Err(ProviderError::malformed_payload(format!(
                "implausible treasury yield: {percent}"
            )));
        }

        // ^TNX quotes the yield in percent.
        Ok(percent / 100.0)
    }

    async fn fetch_real_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        let endpoint = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=1d&interval=1d",
            urlencoding::encode(req.symbol.as_str()),
        );
        let body = self.execute(&endpoint).await?;

        let parsed: YahooChartResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse yahoo chart: {e}"))
        })?;
        let result = chart_result(&parsed)?;

        let spot = result
            .meta
            .regular_market_price
            .ok_or_else(|| ProviderError::malformed_payload("yahoo chart has no market price"))?;

        let rate = self.risk_free_rate().await;

        MarketQuote::new(
            req.symbol.clone(),
            spot,
            rate,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Yahoo,
            None,
            None,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_real_chain(&self, req: &ChainRequest) -> Result<OptionChain, ProviderError> {
        let mut endpoint = format!(
            "https://query1.finance.yahoo.com/v7/finance/options/{}",
            urlencoding::encode(req.symbol.as_str()),
        );
        if let Some(expiry) = req.expiry {
            let midnight = expiry
                .into_inner()
                .midnight()
                .assume_utc()
                .unix_timestamp();
            endpoint.push_str(&format!("?date={midnight}"));
        }
        let body = self.execute(&endpoint).await?;

        let parsed: YahooOptionsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse yahoo options: {e}"))
        })?;
        if let Some(error) = &parsed.option_chain.error {
            if !error.is_empty() {
                return Err(ProviderError::unavailable(format!("yahoo API error: {error}")));
            }
        }

        let result = parsed
            .option_chain
            .result
            .first()
            .ok_or_else(|| ProviderError::not_found("yahoo returned no option chain"))?;
        let slice = result
            .options
            .first()
            .ok_or_else(|| ProviderError::not_found("yahoo chain has no expiries"))?;

        let expiry_ts = time::OffsetDateTime::from_unix_timestamp(slice.expiration_date)
            .map_err(|e| ProviderError::malformed_payload(format!("invalid expiry: {e}")))?;
        let expiry = ExpiryDate::from_date(expiry_ts.date());

        let mut contracts = Vec::with_capacity(slice.calls.len() + slice.puts.len());
        for (rows, option_type) in [
            (&slice.calls, OptionType::Call),
            (&slice.puts, OptionType::Put),
        ] {
            for row in rows.iter() {
                if let Ok(contract) = ContractQuote::new(
                    row.strike,
                    option_type,
                    row.bid,
                    row.ask,
                    row.last_price,
                    row.implied_volatility,
                    row.volume,
                    row.open_interest,
                ) {
                    contracts.push(contract);
                }
            }
        }

        let spot = result
            .quote
            .as_ref()
            .and_then(|q| q.regular_market_price)
            .unwrap_or(0.0);

        OptionChain::new(
            req.symbol.clone(),
            expiry,
            spot,
            UtcDateTime::now(),
            ProviderId::Yahoo,
            contracts,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_real_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        // Fetch roughly twice the window in calendar days to cover weekends.
        let range = match req.window_days {
            0..=20 => "3mo",
            21..=120 => "6mo",
            121..=250 => "1y",
            _ => "2y",
        };
        let endpoint = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval=1d",
            urlencoding::encode(req.symbol.as_str()),
            range,
        );
        let body = self.execute(&endpoint).await?;

        let parsed: YahooChartResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::malformed_payload(format!("failed to parse yahoo chart: {e}"))
        })?;
        let result = chart_result(&parsed)?;

        let closes: Vec<f64> = result
            .indicators
            .quote
            .first()
            .map(|q| q.close.iter().flatten().copied().collect())
            .unwrap_or_default();

        let window = req.window_days as usize + 1;
        let tail = if closes.len() > window {
            &closes[closes.len() - window..]
        } else {
            &closes[..]
        };

        let annualized = annualized_vol(tail).ok_or_else(|| {
            ProviderError::not_found(format!(
                "yahoo returned {} closes, not enough for a {}-day window",
                closes.len(),
                req.window_days
            ))
        })?;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Yahoo,
        )
        .map_err(validation_to_error)
    }
}

// Deterministic offline data.
impl YahooAdapter {
    async fn fetch_fake_spot(&self, req: &SpotRequest) -> Result<MarketQuote, ProviderError> {
        self.execute("https://query1.finance.yahoo.com/v8/finance/chart")
            .await?;
        let spot = fake_spot_price(&req.symbol);
        MarketQuote::new(
            req.symbol.clone(),
            spot,
            DEFAULT_RISK_FREE_RATE,
            0.005,
            0.0,
            UtcDateTime::now(),
            ProviderId::Yahoo,
            Some(spot - 0.05),
            Some(spot + 0.05),
        )
        .map_err(validation_to_error)
    }

    async fn fetch_fake_chain(&self, req: &ChainRequest) -> Result<OptionChain, ProviderError> {
        self.execute("https://query1.finance.yahoo.com/v7/finance/options")
            .await?;

        let spot = fake_spot_price(&req.symbol);
        let expiry = req.expiry.unwrap_or_else(nearest_monthly_expiry);
        let seed = symbol_seed(&req.symbol);
        let base_iv = 0.20 + (seed % 15) as f64 / 100.0;

        let mut contracts = Vec::new();
        for level in 0..11_u32 {
            let strike = ((spot * (0.80 + 0.04 * f64::from(level))) / 2.5).round() * 2.5;
            if strike <= 0.0 {
                continue;
            }
            for option_type in [OptionType::Call, OptionType::Put] {
                let intrinsic = option_type.intrinsic(spot, strike);
                let moneyness = (spot / strike).ln();
                let time_value = 0.04 * spot * (-moneyness * moneyness * 8.0).exp();
                let mid = intrinsic + time_value;
                // Mild smile away from the money.
                let iv = base_iv + moneyness.abs() * 0.10;

                let contract = ContractQuote::new(
                    strike,
                    option_type,
                    Some((mid - 0.05).max(0.0)),
                    Some(mid + 0.05),
                    Some(mid),
                    Some(iv),
                    Some(100 + u64::from(level) * 10),
                    Some(500 + u64::from(level) * 25),
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
            ProviderId::Yahoo,
            contracts,
        )
        .map_err(validation_to_error)
    }

    async fn fetch_fake_hist_vol(&self, req: &HistVolRequest) -> Result<VolEstimate, ProviderError> {
        self.execute("https://query1.finance.yahoo.com/v8/finance/chart")
            .await?;

        let seed = symbol_seed(&req.symbol);
        let annualized = 0.18 + (seed % 25) as f64 / 100.0;

        VolEstimate::new(
            req.symbol.clone(),
            req.window_days,
            annualized,
            UtcDateTime::now(),
            ProviderId::Yahoo,
        )
        .map_err(validation_to_error)
    }
}

fn fake_spot_price(symbol: &Symbol) -> f64 {
    92.0 + (symbol_seed(symbol) % 500) as f64 / 10.0
}

fn nearest_monthly_expiry() -> ExpiryDate {
    let date = time::OffsetDateTime::now_utc().date() + time::Duration::days(30);
    ExpiryDate::from_date(date)
}

fn chart_result(parsed: &YahooChartResponse) -> Result<&YahooChartResult, ProviderError> {
    if let Some(error) = &parsed.chart.error {
        if !error.is_empty() {
            return Err(ProviderError::unavailable(format!("yahoo API error: {error}")));
        }
    }
    parsed
        .chart
        .result
        .first()
        .ok_or_else(|| ProviderError::not_found("yahoo returned no chart data"))
}

// Yahoo Finance API response structures.
#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    result: Vec<YahooChartResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
    #[serde(default)]
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChainData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooOptionChainData {
    result: Vec<YahooOptionChainResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooOptionChainResult {
    #[serde(default)]
    quote: Option<YahooUnderlyingQuote>,
    options: Vec<YahooOptionSlice>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooUnderlyingQuote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooOptionSlice {
    #[serde(rename = "expirationDate")]
    expiration_date: i64,
    #[serde(default)]
    calls: Vec<YahooContractRow>,
    #[serde(default)]
    puts: Vec<YahooContractRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooContractRow {
    strike: f64,
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
    #[serde(rename = "lastPrice", default)]
    last_price: Option<f64>,
    #[serde(rename = "impliedVolatility", default)]
    implied_volatility: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
    #[serde(rename = "openInterest", default)]
    open_interest: Option<u64>,
}
