//! Behavior-driven tests for provider routing.
//!
//! These tests run the full offline stack: real adapters with the
//! deterministic no-network client, wired through the router with the
//! default cache and retry policy.

use std::time::Duration;

use voltick_core::{
    ChainRequest, HistVolRequest, ProviderId, QuoteRouterBuilder, SpotRequest, Symbol,
};

// =============================================================================
// Routing: first healthy provider wins
// =============================================================================

#[tokio::test]
async fn when_all_providers_are_healthy_the_first_configured_one_serves() {
    // Given: the default offline chain (yahoo, polygon, alpaca)
    let router = QuoteRouterBuilder::new().offline().build();
    let request = SpotRequest::new(Symbol::parse("AAPL").expect("valid"));

    // When: a spot quote is routed
    let route = router.route_spot(&request).await.expect("offline spot");

    // Then: yahoo answered, nothing failed, nothing came from cache
    assert_eq!(route.provider, ProviderId::Yahoo);
    assert!(route.failures.is_empty());
    assert!(!route.cache_hit);
    assert!(route.data.spot > 0.0);
    assert_eq!(route.data.symbol.as_str(), "AAPL");
}

#[tokio::test]
async fn when_the_first_provider_lacks_the_endpoint_the_next_one_serves() {
    // Given: alpaca (no chain endpoint) ahead of yahoo
    let router = QuoteRouterBuilder::new()
        .offline()
        .with_providers(vec![ProviderId::Alpaca, ProviderId::Yahoo])
        .build();
    let request = ChainRequest::new(Symbol::parse("MSFT").expect("valid"), None);

    // When: an option chain is routed
    let route = router.route_chain(&request).await.expect("fallback chain");

    // Then: yahoo served after alpaca was skipped without any attempt
    assert_eq!(route.provider, ProviderId::Yahoo);
    assert_eq!(route.failures.len(), 1);
    assert_eq!(route.failures[0].provider, ProviderId::Alpaca);
    assert_eq!(route.failures[0].code, "provider.unsupported_endpoint");
    assert_eq!(route.failures[0].attempts, 0);

    // And: exactly one cache entry exists for the request
    assert_eq!(router.cache().len().await, 1);
}

#[tokio::test]
async fn when_no_provider_supports_the_endpoint_every_failure_is_reported() {
    // Given: a chain request against an alpaca-only configuration
    let router = QuoteRouterBuilder::new()
        .offline()
        .with_providers(vec![ProviderId::Alpaca])
        .build();
    let request = ChainRequest::new(Symbol::parse("MSFT").expect("valid"), None);

    // When: the chain is routed
    let error = router
        .route_chain(&request)
        .await
        .expect_err("no chain-capable provider");

    // Then: the error carries the ordered per-provider diagnostics
    assert_eq!(error.failures().len(), 1);
    assert_eq!(error.failures()[0].provider, ProviderId::Alpaca);
    assert_eq!(error.failures()[0].code, "provider.unsupported_endpoint");

    // And: nothing was cached
    assert!(router.cache().is_empty().await);
}

// =============================================================================
// Caching: cache check precedes any provider call
// =============================================================================

#[tokio::test]
async fn when_the_same_request_repeats_within_ttl_the_cache_serves_it() {
    let router = QuoteRouterBuilder::new().offline().build();
    let request = SpotRequest::new(Symbol::parse("TSLA").expect("valid"));

    // Given: a first fetch that fills the cache
    let first = router.route_spot(&request).await.expect("first fetch");
    assert!(!first.cache_hit);

    // When: the identical request repeats
    let second = router.route_spot(&request).await.expect("second fetch");

    // Then: it is served from cache with the original provider attributed
    assert!(second.cache_hit);
    assert_eq!(second.provider, first.provider);
    assert_eq!(second.data, first.data);
    assert_eq!(router.cache().len().await, 1);
}

#[tokio::test]
async fn when_caching_is_disabled_every_request_goes_to_a_provider() {
    // Given: a zero TTL (--no-cache)
    let router = QuoteRouterBuilder::new()
        .offline()
        .with_cache_ttl(Duration::ZERO)
        .build();
    let request = SpotRequest::new(Symbol::parse("TSLA").expect("valid"));

    router.route_spot(&request).await.expect("first fetch");
    let second = router.route_spot(&request).await.expect("second fetch");

    // Then: the repeat is a fresh provider call
    assert!(!second.cache_hit);
}

#[tokio::test]
async fn distinct_request_signatures_never_collide_in_the_cache() {
    let router = QuoteRouterBuilder::new().offline().build();
    let aapl = SpotRequest::new(Symbol::parse("AAPL").expect("valid"));
    let msft = SpotRequest::new(Symbol::parse("MSFT").expect("valid"));

    let first = router.route_spot(&aapl).await.expect("aapl");
    let second = router.route_spot(&msft).await.expect("msft");

    assert_ne!(first.data.spot, second.data.spot);
    assert_eq!(router.cache().len().await, 2);
}

// =============================================================================
// Offline data shape
// =============================================================================

#[tokio::test]
async fn offline_chains_carry_both_sides_with_ascending_strikes() {
    let router = QuoteRouterBuilder::new().offline().build();
    let request = ChainRequest::new(Symbol::parse("SPY").expect("valid"), None);

    let route = router.route_chain(&request).await.expect("offline chain");
    let chain = route.data;

    assert!(chain.spot > 0.0);
    assert!(!chain.contracts.is_empty());

    let strikes = chain.strikes();
    assert!(strikes.windows(2).all(|pair| pair[0] < pair[1]));
    for &strike in &strikes {
        assert!(chain.call_at(strike).is_some(), "missing call at {strike}");
        assert!(chain.put_at(strike).is_some(), "missing put at {strike}");
    }
}

#[tokio::test]
async fn offline_volatility_estimates_are_annualized_and_plausible() {
    let router = QuoteRouterBuilder::new().offline().build();
    let request =
        HistVolRequest::new(Symbol::parse("AAPL").expect("valid"), 30).expect("valid window");

    let route = router.route_hist_vol(&request).await.expect("offline hv");
    let estimate = route.data;

    assert_eq!(estimate.window_days, 30);
    assert!(estimate.annualized > 0.0 && estimate.annualized < 3.0);
}

#[tokio::test]
async fn historical_volatility_windows_are_bounded() {
    let symbol = Symbol::parse("AAPL").expect("valid");

    assert!(HistVolRequest::new(symbol.clone(), 1).is_err());
    assert!(HistVolRequest::new(symbol.clone(), 731).is_err());
    assert!(HistVolRequest::new(symbol, 730).is_ok());
}
