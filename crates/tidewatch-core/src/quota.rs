//! Local per-provider request budgets.
//!
//! Checked before any network fetch so a busy poller cannot exhaust a
//! provider's daily allowance; a spent budget is treated like a failed fetch.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock as _, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::ProviderId;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget: at most `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderQuota {
    pub window: Duration,
    pub limit: u32,
}

impl ProviderQuota {
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            window: Duration::from_secs(60),
            limit,
        }
    }

    pub const fn default_for(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Cwa => Self::per_minute(60),
            ProviderId::Tdx => Self::per_minute(50),
        }
    }
}

/// Rate limiters keyed by provider; providers without a quota are unlimited.
#[derive(Clone, Default)]
pub struct QuotaGuard {
    limiters: HashMap<ProviderId, Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for QuotaGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGuard")
            .field("providers", &self.limiters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl QuotaGuard {
    /// Default budgets for every provider.
    pub fn with_defaults() -> Self {
        ProviderId::ALL
            .into_iter()
            .fold(Self::unlimited(), |guard, provider| {
                guard.with_quota(provider, ProviderQuota::default_for(provider))
            })
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, provider: ProviderId, quota: ProviderQuota) -> Self {
        self.limiters.insert(
            provider,
            Arc::new(RateLimiter::direct(to_governor_quota(quota))),
        );
        self
    }

    /// Consumes one unit of `provider`'s budget, or returns how long until one frees up.
    pub fn try_acquire(&self, provider: ProviderId) -> Result<(), Duration> {
        let Some(limiter) = self.limiters.get(&provider) else {
            return Ok(());
        };
        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

fn to_governor_quota(quota: ProviderQuota) -> Quota {
    let burst = NonZeroU32::new(quota.limit).unwrap_or(NonZeroU32::MIN);
    let period = quota
        .window
        .checked_div(burst.get())
        .filter(|period| !period.is_zero())
        .unwrap_or(Duration::from_millis(1));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
