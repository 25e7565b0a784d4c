//! OAuth2 client-credentials tokens with single-flight refresh.
//!
//! One token is cached per client id. When it is missing or about to
//! expire, exactly one caller performs the refresh; callers that queued
//! behind it reuse its outcome, success or failure, instead of issuing
//! their own request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::UtcDateTime;

pub const DEFAULT_TOKEN_URL: &str =
    "https://tdx.transportdata.tw/auth/realms/TDXConnect/protocol/openid-connect/token";

/// Tokens expiring within this margin are refreshed early.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct OAuthToken {
    access_token: String,
    expires_at: UtcDateTime,
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>, expires_at: UtcDateTime) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> UtcDateTime {
        self.expires_at
    }

    /// Usable at `now` with at least `margin` to spare.
    pub fn is_valid_at(&self, now: UtcDateTime, margin: Duration) -> bool {
        now.saturating_add(margin) < self.expires_at
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token endpoint unreachable: {message}")]
    Transport { message: String },
    #[error("token endpoint rejected the credentials with status {status}")]
    Rejected { status: u16 },
    #[error("token response is malformed: {message}")]
    Malformed { message: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Default)]
struct SlotState {
    token: Option<OAuthToken>,
    last_error: Option<TokenError>,
}

#[derive(Debug, Default)]
struct TokenSlot {
    state: tokio::sync::Mutex<SlotState>,
    /// Bumped every time a refresh finishes, successfully or not.
    generation: AtomicU64,
}

/// Caches bearer tokens per credential set and refreshes them on demand.
pub struct TokenManager {
    client: Arc<dyn HttpClient>,
    token_url: String,
    clock: Arc<dyn Clock>,
    margin: Duration,
    timeout: Duration,
    slots: Mutex<HashMap<String, Arc<TokenSlot>>>,
}

impl TokenManager {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            token_url: String::from(DEFAULT_TOKEN_URL),
            clock: Arc::new(SystemClock),
            margin: DEFAULT_EXPIRY_MARGIN,
            timeout: Duration::from_secs(10),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a token for `credentials` that is valid beyond the expiry margin.
    ///
    /// The cached token is returned without a network call while it is valid;
    /// otherwise one refresh is performed and shared with every caller that
    /// queued behind it.
    pub async fn get_token(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<OAuthToken, TokenError> {
        let slot = self.slot(credentials.client_id());
        let seen = slot.generation.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;

        if let Some(token) = state
            .token
            .as_ref()
            .filter(|token| token.is_valid_at(self.clock.now(), self.margin))
        {
            return Ok(token.clone());
        }

        // A refresh finished while this caller was queued: share its outcome even
        // when the provider issued a token shorter than the margin.
        if slot.generation.load(Ordering::Acquire) != seen {
            if let Some(error) = &state.last_error {
                debug!(
                    client_id = credentials.client_id(),
                    "sharing failed token refresh"
                );
                return Err(error.clone());
            }
            if let Some(token) = &state.token {
                return Ok(token.clone());
            }
        }

        debug!(client_id = credentials.client_id(), "refreshing access token");
        let shared = match self.request_token(credentials).await {
            Ok(token) => {
                state.token = Some(token.clone());
                state.last_error = None;
                Ok(token)
            }
            Err(error) => {
                warn!(client_id = credentials.client_id(), %error, "token refresh failed");
                state.token = None;
                state.last_error = Some(error.clone());
                Err(error)
            }
        };
        slot.generation.fetch_add(1, Ordering::Release);
        shared
    }

    /// Number of completed refreshes for `client_id`.
    pub fn refresh_count(&self, client_id: &str) -> u64 {
        self.slot(client_id).generation.load(Ordering::Acquire)
    }

    fn slot(&self, client_id: &str) -> Arc<TokenSlot> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(client_id.to_owned()).or_default())
    }

    async fn request_token(&self, credentials: &ClientCredentials) -> Result<OAuthToken, TokenError> {
        let request = HttpRequest::post(&self.token_url)
            .with_auth(&HttpAuth::Basic {
                username: credentials.client_id.clone(),
                password: credentials.client_secret.clone(),
            })
            .with_form(&[("grant_type", "client_credentials")])
            .with_timeout(self.timeout);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|error| TokenError::Transport {
                message: error.message().to_owned(),
            })?;
        if !response.is_success() {
            return Err(TokenError::Rejected {
                status: response.status,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&response.body).map_err(|error| TokenError::Malformed {
                message: error.to_string(),
            })?;
        if parsed.access_token.trim().is_empty() {
            return Err(TokenError::Malformed {
                message: String::from("access_token is empty"),
            });
        }
        let lifetime = u64::try_from(parsed.expires_in)
            .ok()
            .filter(|seconds| *seconds > 0)
            .ok_or_else(|| TokenError::Malformed {
                message: format!("expires_in must be positive, got {}", parsed.expires_in),
            })?;

        Ok(OAuthToken::new(
            parsed.access_token,
            self.clock.now().saturating_add(Duration::from_secs(lifetime)),
        ))
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}
