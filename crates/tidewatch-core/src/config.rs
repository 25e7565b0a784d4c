//! Runtime settings assembled from `TIDEWATCH_*` environment variables.

use std::collections::HashMap;
use std::time::Duration;

use crate::quota::ProviderQuota;
use crate::token::{ClientCredentials, DEFAULT_TOKEN_URL};
use crate::{ConfigError, Feed, FeedKind, ProviderId};

pub const DEFAULT_CWA_BASE_URL: &str = "https://opendata.cwa.gov.tw/api/v1/rest/datastore";
pub const DEFAULT_TDX_BASE_URL: &str = "https://tdx.transportdata.tw/api/basic/v2/Rail/Metro/Alert";

const PREFIX: &str = "TIDEWATCH_";

/// Provider API key; never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Freshness window applied to a feed when no override is configured.
pub const fn default_ttl(kind: FeedKind) -> Duration {
    match kind {
        FeedKind::Seismic | FeedKind::Tsunami => Duration::from_secs(60),
        FeedKind::StationObservation | FeedKind::RegionalObservation => Duration::from_secs(600),
        FeedKind::TransitStatus => Duration::from_secs(120),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cwa_api_key: Option<ApiKey>,
    pub cwa_base_url: String,
    pub tdx_credentials: Option<ClientCredentials>,
    pub tdx_base_url: String,
    pub tdx_token_url: String,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    pub poll_interval: Duration,
    ttl_overrides: HashMap<Feed, Duration>,
    quotas: HashMap<ProviderId, ProviderQuota>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cwa_api_key: None,
            cwa_base_url: String::from(DEFAULT_CWA_BASE_URL),
            tdx_credentials: None,
            tdx_base_url: String::from(DEFAULT_TDX_BASE_URL),
            tdx_token_url: String::from(DEFAULT_TOKEN_URL),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            poll_interval: Duration::from_secs(300),
            ttl_overrides: HashMap::new(),
            quotas: ProviderId::ALL
                .into_iter()
                .map(|provider| (provider, ProviderQuota::default_for(provider)))
                .collect(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Environment Variables
    /// - `TIDEWATCH_CWA_API_KEY`, `TIDEWATCH_CWA_BASE_URL`
    /// - `TIDEWATCH_TDX_CLIENT_ID`, `TIDEWATCH_TDX_CLIENT_SECRET`,
    ///   `TIDEWATCH_TDX_BASE_URL`, `TIDEWATCH_TDX_TOKEN_URL`
    /// - `TIDEWATCH_TIMEOUT_MS` (default: 10000)
    /// - `TIDEWATCH_MAX_RETRIES` (default: 3)
    /// - `TIDEWATCH_POLL_INTERVAL_SECS` (default: 300)
    /// - `TIDEWATCH_<FEED>_TTL_SECS`, e.g. `TIDEWATCH_SEISMIC_NORMAL_TTL_SECS`
    /// - `TIDEWATCH_<PROVIDER>_REQUESTS_PER_MINUTE` (defaults: cwa 60, tdx 50)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };
        let mut settings = Self::default();

        settings.cwa_api_key = vars.text("CWA_API_KEY")?.map(ApiKey::new);
        if let Some(url) = vars.text("CWA_BASE_URL")? {
            settings.cwa_base_url = url;
        }
        settings.tdx_credentials = match (
            vars.text("TDX_CLIENT_ID")?,
            vars.text("TDX_CLIENT_SECRET")?,
        ) {
            (Some(id), Some(secret)) => Some(ClientCredentials::new(id, secret)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Empty {
                    name: format!("{PREFIX}TDX_CLIENT_SECRET"),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Empty {
                    name: format!("{PREFIX}TDX_CLIENT_ID"),
                })
            }
        };
        if let Some(url) = vars.text("TDX_BASE_URL")? {
            settings.tdx_base_url = url;
        }
        if let Some(url) = vars.text("TDX_TOKEN_URL")? {
            settings.tdx_token_url = url;
        }
        if let Some(ms) = vars.positive("TIMEOUT_MS")? {
            settings.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = vars.number::<u32>("MAX_RETRIES")? {
            settings.max_retries = retries;
        }
        if let Some(secs) = vars.positive("POLL_INTERVAL_SECS")? {
            settings.poll_interval = Duration::from_secs(secs);
        }
        for feed in Feed::ALL {
            let name = format!("{}_TTL_SECS", env_segment(feed.as_str()));
            if let Some(secs) = vars.number::<u64>(&name)? {
                settings.ttl_overrides.insert(feed, Duration::from_secs(secs));
            }
        }
        for provider in ProviderId::ALL {
            let name = format!("{}_REQUESTS_PER_MINUTE", env_segment(provider.as_str()));
            if let Some(limit) = vars.positive(&name)? {
                let limit = u32::try_from(limit).unwrap_or(u32::MAX);
                settings
                    .quotas
                    .insert(provider, ProviderQuota::per_minute(limit));
            }
        }

        Ok(settings)
    }

    pub fn with_cwa_api_key(mut self, key: impl Into<String>) -> Self {
        self.cwa_api_key = Some(ApiKey::new(key));
        self
    }

    pub fn with_cwa_base_url(mut self, url: impl Into<String>) -> Self {
        self.cwa_base_url = url.into();
        self
    }

    pub fn with_tdx_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.tdx_credentials = Some(credentials);
        self
    }

    pub fn with_tdx_base_url(mut self, url: impl Into<String>) -> Self {
        self.tdx_base_url = url.into();
        self
    }

    pub fn with_tdx_token_url(mut self, url: impl Into<String>) -> Self {
        self.tdx_token_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_ttl(mut self, feed: Feed, ttl: Duration) -> Self {
        self.ttl_overrides.insert(feed, ttl);
        self
    }

    pub fn with_quota(mut self, provider: ProviderId, quota: ProviderQuota) -> Self {
        self.quotas.insert(provider, quota);
        self
    }

    pub fn ttl_for(&self, feed: Feed) -> Duration {
        self.ttl_overrides
            .get(&feed)
            .copied()
            .unwrap_or_else(|| default_ttl(feed.kind()))
    }

    pub fn quota_for(&self, provider: ProviderId) -> Option<ProviderQuota> {
        self.quotas.get(&provider).copied()
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn raw(&self, name: &str) -> Option<(String, String)> {
        let full = format!("{PREFIX}{name}");
        (self.lookup)(&full).map(|value| (full, value))
    }

    /// Unset is `None`; set but blank is an error.
    fn text(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match self.raw(name) {
            None => Ok(None),
            Some((full, value)) if value.trim().is_empty() => Err(ConfigError::Empty { name: full }),
            Some((_, value)) => Ok(Some(value.trim().to_owned())),
        }
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some((full, value)) = self.raw(name) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: full,
                value,
                reason: "expected a non-negative integer",
            })
    }

    fn positive(&self, name: &str) -> Result<Option<u64>, ConfigError> {
        match self.number::<u64>(name)? {
            Some(0) => Err(ConfigError::InvalidValue {
                name: format!("{PREFIX}{name}"),
                value: String::from("0"),
                reason: "must be greater than zero",
            }),
            other => Ok(other),
        }
    }
}

fn env_segment(name: &str) -> String {
    name.replace('-', "_").to_ascii_uppercase()
}
