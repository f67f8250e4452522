//! In-memory caching of normalized provider responses.
//!
//! The router consults the cache before touching any provider, and writes
//! exactly one entry per successful fetch, keyed by the request signature.
//! Which provider actually served the data is recorded inside the value,
//! not in the key, so a fallback fill and a primary fill occupy the same
//! slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Endpoint, ExpiryDate, MarketQuote, OptionChain, Symbol, VolEstimate};

/// Cache key: the request signature of a routed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub endpoint: Endpoint,
    pub symbol: Symbol,
    pub expiry: Option<ExpiryDate>,
    pub window_days: Option<u32>,
}

impl QuoteKey {
    pub fn spot(symbol: Symbol) -> Self {
        Self {
            endpoint: Endpoint::Spot,
            symbol,
            expiry: None,
            window_days: None,
        }
    }

    pub fn chain(symbol: Symbol, expiry: Option<ExpiryDate>) -> Self {
        Self {
            endpoint: Endpoint::Chain,
            symbol,
            expiry,
            window_days: None,
        }
    }

    pub fn hist_vol(symbol: Symbol, window_days: u32) -> Self {
        Self {
            endpoint: Endpoint::HistVol,
            symbol,
            expiry: None,
            window_days: Some(window_days),
        }
    }
}

/// Normalized response stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Spot(MarketQuote),
    Chain(OptionChain),
    Vol(VolEstimate),
}

/// Time source for expiry checks; swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock advanced explicitly by tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: std::sync::Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("clock lock poisoned");
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().expect("clock lock poisoned");
        self.origin + *offset
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<QuoteKey, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }
}

/// Thread-safe in-memory cache for normalized responses.
#[derive(Clone)]
pub struct QuoteCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    clock: Arc<dyn Clock>,
}

impl QuoteCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Default TTL of 5 minutes.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    /// Cache that never stores anything (`--no-cache`).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(default_ttl))),
            clock,
        }
    }

    /// Fresh entry for the key, or `None` on miss, expiry, or disabled cache.
    pub async fn get(&self, key: &QuoteKey) -> Option<CachedValue> {
        let store = self.inner.read().await;
        store.map.get(key).and_then(|entry| {
            if self.clock.now() <= entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Store a value under its request signature, replacing any prior entry.
    pub async fn put(&self, key: QuoteKey, value: CachedValue, ttl_override: Option<Duration>) {
        let mut store = self.inner.write().await;
        if store.default_ttl == Duration::ZERO {
            return;
        }
        let ttl = ttl_override.unwrap_or(store.default_ttl);
        let expires_at = self.clock.now() + ttl;
        store.map.insert(key, CacheEntry { value, expires_at });
    }

    pub async fn clear_expired(&self) {
        let now = self.clock.now();
        let mut store = self.inner.write().await;
        store.map.retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, including any not yet evicted after expiry.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        let store = self.inner.read().await;
        store.default_ttl == Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderId, UtcDateTime};

    fn spot_value(provider: ProviderId) -> CachedValue {
        CachedValue::Spot(
            MarketQuote::new(
                Symbol::parse("AAPL").expect("symbol"),
                187.5,
                0.05,
                0.004,
                0.0,
                UtcDateTime::parse("2026-01-02T00:00:00Z").expect("timestamp"),
                provider,
                None,
                None,
            )
            .expect("quote"),
        )
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let key = QuoteKey::spot(Symbol::parse("AAPL").expect("symbol"));

        assert!(cache.get(&key).await.is_none());
        cache.put(key.clone(), spot_value(ProviderId::Yahoo), None).await;
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn entry_expires_with_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let cache = QuoteCache::with_clock(Duration::from_secs(300), clock.clone());
        let key = QuoteKey::spot(Symbol::parse("AAPL").expect("symbol"));

        cache.put(key.clone(), spot_value(ProviderId::Yahoo), None).await;
        assert!(cache.get(&key).await.is_some());

        clock.advance(Duration::from_secs(301));
        assert!(cache.get(&key).await.is_none());

        cache.clear_expired().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn fallback_fill_replaces_same_slot() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let key = QuoteKey::spot(Symbol::parse("AAPL").expect("symbol"));

        cache.put(key.clone(), spot_value(ProviderId::Yahoo), None).await;
        cache.put(key.clone(), spot_value(ProviderId::Polygon), None).await;

        assert_eq!(cache.len().await, 1);
        match cache.get(&key).await {
            Some(CachedValue::Spot(quote)) => assert_eq!(quote.provider, ProviderId::Polygon),
            other => panic!("unexpected cache value: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = QuoteCache::disabled();
        let key = QuoteKey::spot(Symbol::parse("AAPL").expect("symbol"));

        assert!(cache.is_disabled().await);
        cache.put(key.clone(), spot_value(ProviderId::Yahoo), None).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn distinct_signatures_occupy_distinct_slots() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let symbol = Symbol::parse("AAPL").expect("symbol");

        cache
            .put(QuoteKey::spot(symbol.clone()), spot_value(ProviderId::Yahoo), None)
            .await;
        cache
            .put(
                QuoteKey::hist_vol(symbol.clone(), 30),
                CachedValue::Vol(
                    VolEstimate::new(
                        symbol,
                        30,
                        0.27,
                        UtcDateTime::parse("2026-01-02T00:00:00Z").expect("timestamp"),
                        ProviderId::Yahoo,
                    )
                    .expect("estimate"),
                ),
                None,
            )
            .await;

        assert_eq!(cache.len().await, 2);
    }
}
