//! Per-provider rate limiting.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::ProviderId;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request quota for one provider over a rolling window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    /// Unauthenticated scrape endpoint; keep well under the informal limit.
    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }

    /// Polygon free tier: 5 requests per minute.
    pub fn polygon_default() -> Self {
        Self {
            provider_id: ProviderId::Polygon,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    /// Alpaca paper data API: 200 requests per minute.
    pub fn alpaca_default() -> Self {
        Self {
            provider_id: ProviderId::Alpaca,
            quota_window: Duration::from_secs(60),
            quota_limit: 200,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Option<Self> {
        match provider_id {
            ProviderId::Yahoo => Some(Self::yahoo_default()),
            ProviderId::Polygon => Some(Self::polygon_default()),
            ProviderId::Alpaca => Some(Self::alpaca_default()),
            ProviderId::Manual => None,
        }
    }
}

/// Local rate gate that spreads a provider's quota across its window.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
}

impl RateGate {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.quota_window, policy.quota_limit)
    }

    /// Whether a request may go out right now. Adapters report a
    /// rate-limited error when budget is exhausted instead of blocking.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_exhausts_after_burst() {
        let gate = RateGate::new(Duration::from_secs(60), 2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn polygon_policy_matches_free_tier() {
        let policy = ProviderPolicy::polygon_default();
        assert_eq!(policy.quota_limit, 5);
        assert_eq!(policy.quota_window, Duration::from_secs(60));
    }

    #[test]
    fn manual_provider_has_no_policy() {
        assert!(ProviderPolicy::default_for(ProviderId::Manual).is_none());
    }
}
