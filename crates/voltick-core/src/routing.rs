//! Provider registry and fallback routing.
//!
//! A routed fetch is cache-first: a fresh cached entry short-circuits the
//! provider chain entirely. On a miss the router walks its configured
//! providers in order, retrying transient failures per provider before
//! falling through, and skipping straight past fatal ones. The first
//! success is written back to the cache under the request signature and
//! returned; if the chain is exhausted the caller gets every per-provider
//! failure in order.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::adapters::{AlpacaAdapter, PolygonAdapter, YahooAdapter};
use crate::cache::{CachedValue, QuoteCache, QuoteKey};
use crate::http::ReqwestHttpClient;
use crate::provider::{
    CapabilitySet, ChainRequest, Endpoint, HealthState, HealthStatus, HistVolRequest,
    MarketDataSource, ProviderError, SpotRequest,
};
use crate::retry::RetryPolicy;
use crate::{EnvelopeError, MarketQuote, OptionChain, ProviderId, VolEstimate};

/// Router tuning knobs.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Fallback order. Providers absent from the registry are recorded as
    /// failures and skipped.
    pub providers: Vec<ProviderId>,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            providers: ProviderId::ROUTABLE.to_vec(),
            cache_ttl: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// One provider's terminal failure during a routed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    /// Attempts made against this provider, including retries.
    pub attempts: u32,
}

impl ProviderFailure {
    fn from_error(provider: ProviderId, error: &ProviderError, attempts: u32) -> Self {
        Self {
            provider,
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.is_transient(),
            attempts,
        }
    }

    pub fn to_envelope_error(&self) -> EnvelopeError {
        // Fields are public, so an adapter outside this crate can hand the
        // router empty diagnostics; substitute placeholders rather than
        // produce an envelope error that fails its own validation.
        let code = match self.code.trim() {
            "" => "provider.internal",
            code => code,
        };
        let message = match self.message.trim() {
            "" => "provider returned no diagnostic message",
            message => message,
        };
        EnvelopeError {
            code: code.to_owned(),
            message: message.to_owned(),
            retryable: Some(self.retryable),
            source: Some(self.provider),
        }
    }
}

/// Successful routed fetch.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    /// Provider that served the data; for a cache hit, the provider that
    /// originally filled the entry.
    pub provider: ProviderId,
    pub provider_chain: Vec<ProviderId>,
    pub failures: Vec<ProviderFailure>,
    pub cache_hit: bool,
    pub latency_ms: u64,
}

/// Routed fetch errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("all providers failed for endpoint '{endpoint}'")]
    AllProvidersFailed {
        endpoint: Endpoint,
        failures: Vec<ProviderFailure>,
    },
}

impl RouterError {
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures, .. } => failures,
        }
    }
}

/// Provider snapshot used by the `sources` command.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn status_label(self) -> &'static str {
        if !self.health.rate_available {
            return "rate_limited";
        }
        match self.health.state {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

type InvokeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Adapter registry and routing engine.
pub struct QuoteRouter {
    adapters: HashMap<ProviderId, Arc<dyn MarketDataSource>>,
    cache: QuoteCache,
    config: RouterConfig,
}

impl Default for QuoteRouter {
    fn default() -> Self {
        Self::new(
            vec![
                Arc::new(YahooAdapter::default()),
                Arc::new(PolygonAdapter::default()),
                Arc::new(AlpacaAdapter::default()),
            ],
            RouterConfig::default(),
        )
    }
}

impl QuoteRouter {
    pub fn new(adapters: Vec<Arc<dyn MarketDataSource>>, config: RouterConfig) -> Self {
        let cache = QuoteCache::new(config.cache_ttl);
        Self::with_cache(adapters, config, cache)
    }

    pub fn with_cache(
        adapters: Vec<Arc<dyn MarketDataSource>>,
        config: RouterConfig,
        cache: QuoteCache,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self {
            adapters,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub async fn snapshot(&self, provider: ProviderId) -> Option<SourceSnapshot> {
        let adapter = self.adapters.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            capabilities: adapter.capabilities(),
            health: adapter.health().await,
        })
    }

    /// Snapshots for every configured provider, in fallback order.
    pub async fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut out = Vec::with_capacity(self.config.providers.len());
        for provider in &self.config.providers {
            if let Some(snapshot) = self.snapshot(*provider).await {
                out.push(snapshot);
            }
        }
        out
    }

    pub async fn route_spot(
        &self,
        req: &SpotRequest,
    ) -> Result<RouteSuccess<MarketQuote>, RouterError> {
        let key = QuoteKey::spot(req.symbol.clone());
        let req = req.clone();
        self.route_endpoint(
            Endpoint::Spot,
            key,
            move |source| source.spot(req.clone()),
            |value| match value {
                CachedValue::Spot(quote) => Some(quote),
                _ => None,
            },
            |quote: &MarketQuote| CachedValue::Spot(quote.clone()),
            |quote| quote.provider,
        )
        .await
    }

    pub async fn route_chain(
        &self,
        req: &ChainRequest,
    ) -> Result<RouteSuccess<OptionChain>, RouterError> {
        let key = QuoteKey::chain(req.symbol.clone(), req.expiry);
        let req = req.clone();
        self.route_endpoint(
            Endpoint::Chain,
            key,
            move |source| source.chain(req.clone()),
            |value| match value {
                CachedValue::Chain(chain) => Some(chain),
                _ => None,
            },
            |chain: &OptionChain| CachedValue::Chain(chain.clone()),
            |chain| chain.provider,
        )
        .await
    }

    pub async fn route_hist_vol(
        &self,
        req: &HistVolRequest,
    ) -> Result<RouteSuccess<VolEstimate>, RouterError> {
        let key = QuoteKey::hist_vol(req.symbol.clone(), req.window_days);
        let req = req.clone();
        self.route_endpoint(
            Endpoint::HistVol,
            key,
            move |source| source.hist_vol(req.clone()),
            |value| match value {
                CachedValue::Vol(estimate) => Some(estimate),
                _ => None,
            },
            |estimate: &VolEstimate| CachedValue::Vol(estimate.clone()),
            |estimate| estimate.provider,
        )
        .await
    }

    async fn route_endpoint<T, F>(
        &self,
        endpoint: Endpoint,
        key: QuoteKey,
        mut invoke: F,
        decode: impl Fn(CachedValue) -> Option<T>,
        encode: impl Fn(&T) -> CachedValue,
        provider_of: impl Fn(&T) -> ProviderId,
    ) -> Result<RouteSuccess<T>, RouterError>
    where
        F: for<'a> FnMut(&'a dyn MarketDataSource) -> InvokeFuture<'a, T>,
    {
        let started = Instant::now();

        if let Some(value) = self.cache.get(&key).await {
            if let Some(data) = decode(value) {
                let provider = provider_of(&data);
                return Ok(RouteSuccess {
                    data,
                    provider,
                    provider_chain: vec![provider],
                    failures: Vec::new(),
                    cache_hit: true,
                    latency_ms: elapsed_ms(started),
                });
            }
        }

        let mut provider_chain = Vec::with_capacity(self.config.providers.len());
        let mut failures = Vec::new();

        for provider in &self.config.providers {
            provider_chain.push(*provider);

            let Some(adapter) = self.adapters.get(provider) else {
                failures.push(ProviderFailure::from_error(
                    *provider,
                    &ProviderError::adapter_not_registered(*provider),
                    0,
                ));
                continue;
            };

            if !adapter.capabilities().supports(endpoint) {
                failures.push(ProviderFailure::from_error(
                    *provider,
                    &ProviderError::unsupported_endpoint(endpoint),
                    0,
                ));
                continue;
            }

            let mut attempts = 0_u32;
            loop {
                attempts += 1;
                match invoke(adapter.as_ref()).await {
                    Ok(data) => {
                        self.cache.put(key.clone(), encode(&data), None).await;
                        return Ok(RouteSuccess {
                            data,
                            provider: *provider,
                            provider_chain,
                            failures,
                            cache_hit: false,
                            latency_ms: elapsed_ms(started),
                        });
                    }
                    Err(error) => {
                        let may_retry = error.is_transient()
                            && self.config.retry.enabled
                            && attempts <= self.config.retry.max_retries;
                        if may_retry {
                            let delay = self.config.retry.delay_for_attempt(attempts - 1);
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                        failures.push(ProviderFailure::from_error(*provider, &error, attempts));
                        break;
                    }
                }
            }
        }

        Err(RouterError::AllProvidersFailed { endpoint, failures })
    }
}

/// Builder assembling a [`QuoteRouter`] for offline or live use.
///
/// In live mode each credentialed provider is registered only when its
/// environment variables are present; a missing key drops the provider
/// from the registry so routing records it as not registered instead of
/// failing on every call.
///
/// | Provider | Environment |
/// |----------|-------------|
/// | Yahoo | none |
/// | Polygon | `POLYGON_API_KEY` |
/// | Alpaca | `ALPACA_PAPER_API_KEY`, `ALPACA_PAPER_SECRET_KEY` |
#[derive(Debug, Clone)]
pub struct QuoteRouterBuilder {
    offline: bool,
    config: RouterConfig,
}

impl Default for QuoteRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteRouterBuilder {
    pub fn new() -> Self {
        Self {
            offline: false,
            config: RouterConfig::default(),
        }
    }

    /// All adapters use the no-op transport with deterministic data.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.config.providers = providers;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> QuoteRouter {
        if self.offline {
            return QuoteRouter::new(
                vec![
                    Arc::new(YahooAdapter::default()),
                    Arc::new(PolygonAdapter::default()),
                    Arc::new(AlpacaAdapter::default()),
                ],
                self.config,
            );
        }

        let http_client = Arc::new(ReqwestHttpClient::new());
        let mut adapters: Vec<Arc<dyn MarketDataSource>> = vec![Arc::new(
            YahooAdapter::with_http_client(http_client.clone()),
        )];

        if let Ok(polygon) = PolygonAdapter::from_env(http_client.clone()) {
            adapters.push(Arc::new(polygon));
        }
        if let Ok(alpaca) = AlpacaAdapter::from_env(http_client) {
            adapters.push(Arc::new(alpaca));
        }

        QuoteRouter::new(adapters, self.config)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    /// Adapter that always fails with a configured error.
    struct FailingSource {
        id: ProviderId,
        error: ProviderError,
    }

    impl MarketDataSource for FailingSource {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::full()
        }

        fn spot<'a>(
            &'a self,
            _req: SpotRequest,
        ) -> InvokeFuture<'a, MarketQuote> {
            let error = self.error.clone();
            Box::pin(async move { Err(error) })
        }

        fn chain<'a>(
            &'a self,
            _req: ChainRequest,
        ) -> InvokeFuture<'a, OptionChain> {
            let error = self.error.clone();
            Box::pin(async move { Err(error) })
        }

        fn hist_vol<'a>(
            &'a self,
            _req: HistVolRequest,
        ) -> InvokeFuture<'a, VolEstimate> {
            let error = self.error.clone();
            Box::pin(async move { Err(error) })
        }

        fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
            Box::pin(async move { HealthStatus::new(HealthState::Unhealthy, false) })
        }
    }

    fn no_retry_config() -> RouterConfig {
        RouterConfig {
            retry: RetryPolicy::no_retry(),
            ..RouterConfig::default()
        }
    }

    #[test]
    fn empty_provider_diagnostics_get_placeholder_envelope_fields() {
        let failure = ProviderFailure {
            provider: ProviderId::Polygon,
            code: String::new(),
            message: String::from("  "),
            retryable: false,
            attempts: 1,
        };

        let error = failure.to_envelope_error();
        assert_eq!(error.code, "provider.internal");
        assert_eq!(error.message, "provider returned no diagnostic message");
        assert_eq!(error.source, Some(ProviderId::Polygon));
        assert!(error.validate().is_ok());
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let router = QuoteRouter::default();
        let req = SpotRequest::new(Symbol::parse("AAPL").expect("symbol"));

        let first = router.route_spot(&req).await.expect("route");
        assert!(!first.cache_hit);

        let second = router.route_spot(&req).await.expect("route");
        assert!(second.cache_hit);
        assert_eq!(second.provider, first.provider);
        assert_eq!(router.cache().len().await, 1);
    }

    #[tokio::test]
    async fn fatal_failure_falls_through_to_next_provider() {
        let router = QuoteRouter::new(
            vec![
                Arc::new(FailingSource {
                    id: ProviderId::Yahoo,
                    error: ProviderError::auth_failed("yahoo says no"),
                }),
                Arc::new(PolygonAdapter::default()),
                Arc::new(AlpacaAdapter::default()),
            ],
            no_retry_config(),
        );
        let req = SpotRequest::new(Symbol::parse("AAPL").expect("symbol"));

        let success = router.route_spot(&req).await.expect("route");
        assert_eq!(success.provider, ProviderId::Polygon);
        assert_eq!(
            success.provider_chain,
            vec![ProviderId::Yahoo, ProviderId::Polygon]
        );
        assert_eq!(success.failures.len(), 1);
        assert_eq!(success.failures[0].provider, ProviderId::Yahoo);
        assert_eq!(success.failures[0].attempts, 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_before_falling_through() {
        let config = RouterConfig {
            retry: RetryPolicy::fixed(Duration::ZERO, 2),
            ..RouterConfig::default()
        };
        let router = QuoteRouter::new(
            vec![
                Arc::new(FailingSource {
                    id: ProviderId::Yahoo,
                    error: ProviderError::unavailable("upstream timeout"),
                }),
                Arc::new(PolygonAdapter::default()),
            ],
            config,
        );
        let req = SpotRequest::new(Symbol::parse("AAPL").expect("symbol"));

        let success = router.route_spot(&req).await.expect("route");
        assert_eq!(success.provider, ProviderId::Polygon);
        // Two retries plus the initial attempt.
        assert_eq!(success.failures[0].attempts, 3);
        // The fallback success fills exactly one slot.
        assert_eq!(router.cache().len().await, 1);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_failure() {
        let router = QuoteRouter::new(
            vec![
                Arc::new(FailingSource {
                    id: ProviderId::Yahoo,
                    error: ProviderError::auth_failed("bad cookie"),
                }),
                Arc::new(FailingSource {
                    id: ProviderId::Polygon,
                    error: ProviderError::not_found("unknown ticker"),
                }),
            ],
            RouterConfig {
                providers: vec![ProviderId::Yahoo, ProviderId::Polygon],
                retry: RetryPolicy::no_retry(),
                ..RouterConfig::default()
            },
        );
        let req = SpotRequest::new(Symbol::parse("ZZZZ").expect("symbol"));

        let error = router.route_spot(&req).await.expect_err("must fail");
        let failures = error.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].provider, ProviderId::Yahoo);
        assert_eq!(failures[1].provider, ProviderId::Polygon);
        assert_eq!(router.cache().len().await, 0);
    }

    #[tokio::test]
    async fn chain_requests_skip_providers_without_chain_support() {
        let router = QuoteRouter::new(
            vec![Arc::new(AlpacaAdapter::default())],
            RouterConfig {
                providers: vec![ProviderId::Alpaca],
                retry: RetryPolicy::no_retry(),
                ..RouterConfig::default()
            },
        );
        let req = ChainRequest::new(Symbol::parse("AAPL").expect("symbol"), None);

        let error = router.route_chain(&req).await.expect_err("must fail");
        let failures = error.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code, "provider.unsupported_endpoint");
        assert_eq!(failures[0].attempts, 0);
    }

    #[tokio::test]
    async fn unregistered_provider_is_recorded_and_skipped() {
        let router = QuoteRouter::new(
            vec![Arc::new(YahooAdapter::default())],
            RouterConfig {
                providers: vec![ProviderId::Polygon, ProviderId::Yahoo],
                retry: RetryPolicy::no_retry(),
                ..RouterConfig::default()
            },
        );
        let req = SpotRequest::new(Symbol::parse("AAPL").expect("symbol"));

        let success = router.route_spot(&req).await.expect("route");
        assert_eq!(success.provider, ProviderId::Yahoo);
        assert_eq!(success.failures[0].code, "provider.adapter_not_registered");
    }
}
