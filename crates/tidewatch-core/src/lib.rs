//! # Tidewatch Core
//!
//! Resilient ingestion of public seismic, tsunami, weather-station and transit feeds.
//!
//! ## Overview
//!
//! Upstream providers time out, throttle, change their JSON layout without notice and
//! sometimes answer with schema metadata instead of data. This crate turns all of that into
//! one guarantee: every call yields a normalized record, labelled with where it came from.
//!
//! - **Fetcher** with bounded timeouts and retries for transient failures
//! - **Normalizer** built from ordered variant tables per record family
//! - **Cache store** with per-feed TTL and stale fallback
//! - **Token manager** for OAuth2 client credentials with single-flight refresh
//! - **Backup synthesizer** producing well-formed placeholder records
//! - **Orchestrator** composing the above into [`Orchestrator::fetch_feed`]
//! - **Poller** refreshing a feed in the background and publishing new reports
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`backup`] | Placeholder records for when nothing real is available |
//! | [`cache`] | TTL cache keyed by feed |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Settings from `TIDEWATCH_*` environment variables |
//! | [`domain`] | Feeds, keys and canonical records |
//! | [`error`] | Validation and configuration errors |
//! | [`fetcher`] | HTTP GET with retries |
//! | [`http_client`] | HTTP client abstraction |
//! | [`normalize`] | Multi-schema JSON normalization |
//! | [`orchestrator`] | Cache, fetch, normalize and fallback |
//! | [`poller`] | Background refresh and service lifecycle |
//! | [`quota`] | Local per-provider request budgets |
//! | [`request`] | Provider request construction |
//! | [`retry`] | Backoff and retry policy |
//! | [`source`] | Provider identifiers |
//! | [`token`] | OAuth2 client-credentials tokens |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidewatch_core::{Feed, FeedKey, IngestService, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = IngestService::from_settings(Settings::from_env()?);
//!
//!     let key = FeedKey::plain(Feed::SeismicNormal)?;
//!     let result = service.fetch_feed(&key).await;
//!
//!     if let Some(notice) = result.notice() {
//!         eprintln!("{notice}");
//!     }
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!
//!     service.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  CLI / Poller   │────▶│  Orchestrator    │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │
//!          ┌───────────────┬───────┴───────┬────────────────┐
//!          ▼               ▼               ▼                ▼
//! ┌──────────────┐ ┌──────────────┐ ┌─────────────┐ ┌──────────────┐
//! │ Cache Store  │ │ Token Manager│ │  Fetcher    │ │  Normalizer  │
//! └──────────────┘ └──────┬───────┘ └──────┬──────┘ └──────────────┘
//!                         │                │
//!                         ▼                ▼
//!                  ┌──────────────────────────────┐
//!                  │ HTTP Client (reqwest pool)   │
//!                  └──────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! [`Orchestrator::fetch_feed`] never fails. Failures surface as an [`ErrorKind`] on the
//! result, next to a stale or backup record:
//!
//! ```rust
//! use tidewatch_core::{ErrorKind, FetchResult, Provenance};
//!
//! fn describe(result: &FetchResult) -> &'static str {
//!     match (result.source, result.error) {
//!         (Provenance::Live, _) => "live",
//!         (_, Some(ErrorKind::UpstreamDegraded)) => "check credentials",
//!         (Provenance::Stale, _) => "outdated",
//!         _ => "placeholder",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys and client secrets are read from environment variables only and never logged
//! - Access tokens are redacted from `Debug` output

pub mod backup;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod poller;
pub mod quota;
pub mod request;
pub mod retry;
pub mod source;
pub mod token;

#[cfg(test)]
mod test_support;

// Caching
pub use cache::{CacheEntry, CacheMode, CacheStore};

// Time
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration
pub use config::{ApiKey, Settings};

// Domain models
pub use domain::{
    Epicenter, Feed, FeedKey, FeedKind, Magnitude, NormalizedRecord, Observed, Provenance,
    RegionalObservation, SeismicReport, ServiceAlert, ServiceState, ShakingArea,
    StationObservation, TransitStatus, TsunamiBulletin, UtcDateTime, WarningArea,
};

// Error types
pub use error::{ConfigError, ValidationError};

// Fetching
pub use fetcher::{FetchError, FetchErrorKind, Fetcher};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Normalization
pub use normalize::{normalize, normalize_for, NormError, NormErrorKind};

// Orchestration
pub use orchestrator::{ErrorKind, FetchResult, Orchestrator};

// Background polling
pub use poller::{IngestService, Poller, PollerHandle};

// Quotas
pub use quota::{ProviderQuota, QuotaGuard};

// Retry logic
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};

// Source identifiers
pub use source::ProviderId;

// Tokens
pub use token::{ClientCredentials, OAuthToken, TokenError, TokenManager};
