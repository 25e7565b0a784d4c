//! Cache, fetch, normalize and fallback composed into one call that always yields a record.
//!
//! ```text
//! CheckCache ──fresh──▶ ReturnLive
//!     │ miss/stale
//!     ▼
//!   Fetch ──ok──▶ Normalize ──ok──▶ Store ──▶ ReturnLive
//!     │ fail          │ fail
//!     ▼               ▼
//!   Fallback ──stale entry──▶ ReturnStale
//!     │ nothing cached
//!     ▼
//!   ReturnBackup
//! ```

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backup::synthesize;
use crate::cache::{CacheEntry, CacheMode, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::fetcher::{FetchError, FetchErrorKind, Fetcher};
use crate::http_client::HttpClient;
use crate::normalize::{normalize_for, NormError, NormErrorKind};
use crate::quota::QuotaGuard;
use crate::request::{cwa_request, tdx_request};
use crate::retry::{RetryPolicy, Sleeper};
use crate::token::{TokenError, TokenManager};
use crate::{FeedKey, NormalizedRecord, Provenance, ProviderId, UtcDateTime};

/// Why live data could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timeouts, resets or 5xx responses persisted through every retry.
    TransientNetwork,
    NonRetryableHttp,
    /// The provider answered with schema metadata and no records.
    UpstreamDegraded,
    /// The payload matched no known shape, or a known shape lacked required fields.
    Unrecognized,
    /// The provider has nothing published for this feed right now.
    NoData,
    TokenAcquisition,
    /// The local request budget for the provider is spent.
    QuotaExhausted,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::NonRetryableHttp => "non_retryable_http",
            Self::UpstreamDegraded => "upstream_degraded",
            Self::Unrecognized => "unrecognized",
            Self::NoData => "no_data",
            Self::TokenAcquisition => "token_acquisition",
            Self::QuotaExhausted => "quota_exhausted",
        }
    }

    /// Short user-facing explanation.
    pub const fn notice(self) -> &'static str {
        match self {
            Self::TransientNetwork => {
                "The data provider is not responding; information may be outdated."
            }
            Self::NonRetryableHttp => {
                "The data provider rejected the request; information may be outdated."
            }
            Self::UpstreamDegraded => {
                "The data provider returned no records. This usually means the API key or \
                 credentials are missing, invalid or expired."
            }
            Self::Unrecognized => {
                "The data provider changed its response format; information may be outdated."
            }
            Self::NoData => "The data provider has nothing published for this feed right now.",
            Self::TokenAcquisition => {
                "Could not authenticate with the transport data provider; check the client \
                 credentials."
            }
            Self::QuotaExhausted => {
                "The request budget for this provider is used up; information may be outdated."
            }
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The only value handed to collaborators: a record, where it came from, and why if not live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub key: FeedKey,
    pub record: NormalizedRecord,
    pub source: Provenance,
    pub error: Option<ErrorKind>,
    /// When the record was obtained from the provider, or synthesized for backups.
    pub fetched_at: UtcDateTime,
}

impl FetchResult {
    fn live(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            record: entry.record,
            source: Provenance::Live,
            error: None,
            fetched_at: entry.fetched_at,
        }
    }

    fn stale(entry: CacheEntry, error: ErrorKind) -> Self {
        Self {
            key: entry.key,
            record: entry.record,
            source: Provenance::Stale,
            error: Some(error),
            fetched_at: entry.fetched_at,
        }
    }

    fn backup(key: FeedKey, error: ErrorKind, now: UtcDateTime) -> Self {
        Self {
            record: synthesize(key.kind(), now),
            key,
            source: Provenance::Backup,
            error: Some(error),
            fetched_at: now,
        }
    }

    /// `true` unless the record is live provider data.
    pub fn is_outdated(&self) -> bool {
        self.source != Provenance::Live
    }

    pub fn notice(&self) -> Option<&'static str> {
        self.error.map(ErrorKind::notice)
    }
}

/// A failed live attempt: its classification plus detail for the logs.
#[derive(Debug)]
struct Failure {
    kind: ErrorKind,
    detail: String,
}

impl From<FetchError> for Failure {
    fn from(error: FetchError) -> Self {
        let kind = match error.kind() {
            FetchErrorKind::Exhausted => ErrorKind::TransientNetwork,
            FetchErrorKind::NonRetryable => ErrorKind::NonRetryableHttp,
        };
        Self {
            kind,
            detail: error.to_string(),
        }
    }
}

impl From<NormError> for Failure {
    fn from(error: NormError) -> Self {
        let kind = match error.kind() {
            NormErrorKind::UpstreamDegraded => ErrorKind::UpstreamDegraded,
            NormErrorKind::Unrecognized | NormErrorKind::Incomplete => ErrorKind::Unrecognized,
            NormErrorKind::Empty => ErrorKind::NoData,
        };
        Self {
            kind,
            detail: error.to_string(),
        }
    }
}

impl From<TokenError> for Failure {
    fn from(error: TokenError) -> Self {
        Self {
            kind: ErrorKind::TokenAcquisition,
            detail: error.to_string(),
        }
    }
}

/// Serves feeds from cache, provider, stale cache or backup, in that order.
pub struct Orchestrator {
    settings: Settings,
    fetcher: Fetcher,
    cache: CacheStore,
    tokens: Arc<TokenManager>,
    quota: QuotaGuard,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(settings: Settings, client: Arc<dyn HttpClient>) -> Self {
        Self::with_clock(settings, client, Arc::new(SystemClock))
    }

    /// Wires every component to one transport and one clock.
    pub fn with_clock(
        settings: Settings,
        client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = RetryPolicy::default().with_max_retries(settings.max_retries);
        let tokens = TokenManager::new(Arc::clone(&client))
            .with_token_url(settings.tdx_token_url.clone())
            .with_timeout(settings.timeout)
            .with_clock(Arc::clone(&clock));
        let quota = ProviderId::ALL
            .into_iter()
            .fold(QuotaGuard::unlimited(), |guard, provider| {
                match settings.quota_for(provider) {
                    Some(quota) => guard.with_quota(provider, quota),
                    None => guard,
                }
            });

        Self {
            fetcher: Fetcher::new(client, policy),
            cache: CacheStore::new(Arc::clone(&clock)),
            tokens: Arc::new(tokens),
            quota,
            clock,
            settings,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.fetcher = self.fetcher.with_sleeper(sleeper);
        self
    }

    pub fn with_quota_guard(mut self, quota: QuotaGuard) -> Self {
        self.quota = quota;
        self
    }

    /// Shares an existing cache, e.g. between orchestrators in one process.
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Serves `key`, preferring a fresh cache entry.
    pub async fn fetch_feed(&self, key: &FeedKey) -> FetchResult {
        self.fetch_feed_with(key, CacheMode::Use).await
    }

    /// Serves `key` under the given cache mode. Never fails: the worst case is a backup record.
    pub async fn fetch_feed_with(&self, key: &FeedKey, mode: CacheMode) -> FetchResult {
        if mode == CacheMode::Use {
            if let Some(entry) = self.cache.get(key).await {
                debug!(feed = %key, "serving fresh cache entry");
                return FetchResult::live(entry);
            }
        }

        let failure = match self.fetch_live(key).await {
            Ok(record) => {
                let ttl = self.settings.ttl_for(key.feed());
                let entry = self.cache.put(key.clone(), record, ttl).await;
                info!(
                    feed = %key,
                    record_id = %entry.record.record_id(),
                    ttl_secs = ttl.as_secs(),
                    "feed refreshed"
                );
                return FetchResult::live(entry);
            }
            Err(failure) => failure,
        };

        match self.cache.get_ignoring_ttl(key).await {
            Some(entry) => {
                warn!(
                    feed = %key,
                    error = failure.kind.code(),
                    detail = %failure.detail,
                    age_secs = entry.age(self.clock.now()).as_secs(),
                    "live fetch failed; serving stale cache entry"
                );
                FetchResult::stale(entry, failure.kind)
            }
            None => {
                warn!(
                    feed = %key,
                    error = failure.kind.code(),
                    detail = %failure.detail,
                    "live fetch failed and nothing is cached; serving backup record"
                );
                FetchResult::backup(key.clone(), failure.kind, self.clock.now())
            }
        }
    }

    async fn fetch_live(&self, key: &FeedKey) -> Result<NormalizedRecord, Failure> {
        let provider = key.provider();
        if let Err(wait) = self.quota.try_acquire(provider) {
            return Err(Failure {
                kind: ErrorKind::QuotaExhausted,
                detail: format!(
                    "{provider} request budget spent; next slot in {}ms",
                    wait.as_millis()
                ),
            });
        }

        let request = match provider {
            ProviderId::Cwa => cwa_request(&self.settings, key),
            ProviderId::Tdx => {
                let credentials =
                    self.settings
                        .tdx_credentials
                        .as_ref()
                        .ok_or_else(|| Failure {
                            kind: ErrorKind::TokenAcquisition,
                            detail: String::from("no client credentials configured"),
                        })?;
                let token = self.tokens.get_token(credentials).await?;
                tdx_request(&self.settings, key, &token)
            }
        };

        let raw = self.fetcher.fetch_request(request).await?;
        Ok(normalize_for(key, &raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::quota::ProviderQuota;
    use crate::test_support::{RecordingSleeper, ScriptedHttpClient};
    use crate::token::ClientCredentials;
    use crate::Feed;
    use std::time::Duration;

    const QUAKE: &str = r#"{"success":"true","records":{"Earthquake":[{
        "EarthquakeNo": 115071,
        "ReportContent": "花蓮縣近海發生有感地震",
        "EarthquakeInfo": {"OriginTime": "2026-10-16 08:12:41", "Epicenter": {"Location": "花蓮縣近海"}}
    }]}}"#;

    const STUB: &str =
        r#"{"success":"true","result":{"resource_id":"E-A0015-001","fields":[{"id":"EarthquakeNo"}]}}"#;

    struct Harness {
        client: Arc<ScriptedHttpClient>,
        clock: ManualClock,
        orchestrator: Orchestrator,
    }

    fn harness(script: Vec<Result<HttpResponse, HttpError>>, settings: Settings) -> Harness {
        let client = Arc::new(ScriptedHttpClient::new(script));
        let clock = ManualClock::new(UtcDateTime::parse("2026-10-16T00:00:00Z").unwrap());
        let orchestrator = Orchestrator::with_clock(settings, client.clone(), Arc::new(clock.clone()))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        Harness {
            client,
            clock,
            orchestrator,
        }
    }

    fn seismic() -> FeedKey {
        FeedKey::plain(Feed::SeismicNormal).unwrap()
    }

    #[tokio::test]
    async fn live_fetch_is_cached_and_fresh_hits_skip_the_network() {
        let h = harness(vec![Ok(HttpResponse::ok_json(QUAKE))], Settings::default());

        let first = h.orchestrator.fetch_feed(&seismic()).await;
        h.clock.advance(Duration::from_secs(30));
        let second = h.orchestrator.fetch_feed(&seismic()).await;

        assert_eq!(first.source, Provenance::Live);
        assert_eq!(first.error, None);
        assert_eq!(first.record.record_id(), "115071");
        assert_eq!(second, first);
        assert_eq!(h.client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_fetch_serves_stale_entry_for_same_key_only() {
        let mut script = vec![Ok(HttpResponse::ok_json(QUAKE))];
        script.extend((0..8).map(|_| Ok(HttpResponse::new(503, ""))));
        let h = harness(script, Settings::default().with_max_retries(3));

        h.orchestrator.fetch_feed(&seismic()).await;
        h.clock.advance(Duration::from_secs(61));
        let stale = h.orchestrator.fetch_feed(&seismic()).await;
        let other = h
            .orchestrator
            .fetch_feed(&FeedKey::plain(Feed::SeismicSmallArea).unwrap())
            .await;

        assert_eq!(stale.source, Provenance::Stale);
        assert_eq!(stale.error, Some(ErrorKind::TransientNetwork));
        assert_eq!(stale.record.record_id(), "115071");
        assert!(stale.is_outdated());
        assert_eq!(other.source, Provenance::Backup);
        assert_eq!(h.client.recorded_requests().len(), 9);
    }

    #[tokio::test]
    async fn nothing_cached_yields_backup_record() {
        let h = harness(
            vec![Err(HttpError::other("dns failure"))],
            Settings::default(),
        );

        let result = h.orchestrator.fetch_feed(&seismic()).await;

        assert_eq!(result.source, Provenance::Backup);
        assert_eq!(result.error, Some(ErrorKind::NonRetryableHttp));
        assert_eq!(result.record.record_id(), "BACKUP-seismic-20261016T000000Z");
        assert_eq!(result.fetched_at, h.clock.now());
        assert!(h.orchestrator.cache().is_empty().await);
    }

    #[tokio::test]
    async fn degraded_stub_falls_back_with_credential_notice() {
        let h = harness(vec![Ok(HttpResponse::ok_json(STUB))], Settings::default());

        let result = h.orchestrator.fetch_feed(&seismic()).await;

        assert_eq!(result.source, Provenance::Backup);
        assert_eq!(result.error, Some(ErrorKind::UpstreamDegraded));
        assert!(result.notice().unwrap().contains("credentials"));
        assert_eq!(h.client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn refresh_mode_refetches_but_keeps_stale_fallback() {
        let h = harness(
            vec![
                Ok(HttpResponse::ok_json(QUAKE)),
                Ok(HttpResponse::ok_json(r#"{"records":{"Earthquake":[]}}"#)),
            ],
            Settings::default(),
        );

        h.orchestrator.fetch_feed(&seismic()).await;
        let refreshed = h
            .orchestrator
            .fetch_feed_with(&seismic(), CacheMode::Refresh)
            .await;

        assert_eq!(refreshed.source, Provenance::Stale);
        assert_eq!(refreshed.error, Some(ErrorKind::NoData));
        assert_eq!(h.client.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn transit_feed_without_credentials_reports_token_failure() {
        let h = harness(Vec::new(), Settings::default());
        let key = FeedKey::new(Feed::TransitStatusBySystem, Some("TRTC")).unwrap();

        let result = h.orchestrator.fetch_feed(&key).await;

        assert_eq!(result.source, Provenance::Backup);
        assert_eq!(result.error, Some(ErrorKind::TokenAcquisition));
        assert!(h.client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn transit_feed_fetches_token_then_alerts() {
        let settings = Settings::default()
            .with_tdx_credentials(ClientCredentials::new("id", "secret"))
            .with_tdx_token_url("https://auth.test/token")
            .with_tdx_base_url("https://tdx.test/Alert");
        let h = harness(
            vec![
                Ok(HttpResponse::ok_json(
                    r#"{"access_token":"tok","expires_in":86400}"#,
                )),
                Ok(HttpResponse::ok_json(r#"{"Alerts":[]}"#)),
            ],
            settings,
        );
        let key = FeedKey::new(Feed::TransitStatusBySystem, Some("TRTC")).unwrap();

        let result = h.orchestrator.fetch_feed(&key).await;

        assert_eq!(result.source, Provenance::Live);
        let requests = h.client.recorded_requests();
        assert_eq!(requests[0].url, "https://auth.test/token");
        assert_eq!(
            requests[1].headers.get("authorization").map(String::as_str),
            Some("Bearer tok")
        );
    }

    #[tokio::test]
    async fn spent_quota_skips_the_network() {
        let h = harness(vec![Ok(HttpResponse::ok_json(QUAKE))], Settings::default());
        let orchestrator = h.orchestrator.with_quota_guard(
            QuotaGuard::unlimited().with_quota(ProviderId::Cwa, ProviderQuota::per_minute(1)),
        );

        orchestrator.fetch_feed(&seismic()).await;
        let limited = orchestrator
            .fetch_feed_with(&seismic(), CacheMode::Refresh)
            .await;

        assert_eq!(limited.source, Provenance::Stale);
        assert_eq!(limited.error, Some(ErrorKind::QuotaExhausted));
        assert_eq!(h.client.recorded_requests().len(), 1);
    }

    #[test]
    fn fetch_result_serializes_for_collaborators() {
        let key = seismic();
        let now = UtcDateTime::parse("2026-10-16T00:00:00Z").unwrap();
        let result = FetchResult::backup(key, ErrorKind::TransientNetwork, now);

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["source"], "backup");
        assert_eq!(json["error"], "transient_network");
        assert_eq!(json["record"]["kind"], "seismic");
        assert_eq!(json["fetched_at"], "2026-10-16T00:00:00Z");
    }
}
