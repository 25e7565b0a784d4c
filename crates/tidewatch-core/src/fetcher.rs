//! HTTP GET with bounded timeout and bounded retries for transient failures.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::http_client::{HttpClient, HttpRequest};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Fetch failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Permanent failure reported on first sight: non-transient 4xx, unparseable JSON,
    /// or an unusable request.
    NonRetryable,
    /// Every attempt failed with a transient condition.
    Exhausted,
}

/// Typed fetch failure; the fetcher never returns partial or garbled payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    attempts: u32,
    status: Option<u16>,
}

impl FetchError {
    pub fn non_retryable(message: impl Into<String>, attempts: u32, status: Option<u16>) -> Self {
        Self {
            kind: FetchErrorKind::NonRetryable,
            message: message.into(),
            attempts,
            status,
        }
    }

    pub fn exhausted(message: impl Into<String>, attempts: u32, status: Option<u16>) -> Self {
        Self {
            kind: FetchErrorKind::Exhausted,
            message: message.into(),
            attempts,
            status,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Number of requests issued before giving up.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Last HTTP status seen, if the failure was a status rather than a transport error.
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::NonRetryable => "fetch.non_retryable",
            FetchErrorKind::Exhausted => "fetch.exhausted",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {} attempt(s) ({})",
            self.message,
            self.attempts,
            self.code()
        )
    }
}

impl std::error::Error for FetchError {}

/// Retrying JSON fetcher over an injected transport.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    pub fn new(client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GETs `url` with `params` and parses the body as JSON.
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Value, FetchError> {
        let request = params
            .iter()
            .fold(HttpRequest::get(url), |request, (name, value)| {
                request.with_query(*name, *value)
            })
            .with_timeout(timeout);
        self.execute_with_retries(request, max_retries).await
    }

    /// Executes a prepared request, retrying transient failures as often as the policy allows.
    pub async fn fetch_request(&self, request: HttpRequest) -> Result<Value, FetchError> {
        self.execute_with_retries(request, self.policy.max_retries).await
    }

    async fn execute_with_retries(
        &self,
        request: HttpRequest,
        max_retries: u32,
    ) -> Result<Value, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let (reason, status) = match self.client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(url = %request.url, attempt, status = response.status, "fetch succeeded");
                    return serde_json::from_str(&response.body).map_err(|e| {
                        FetchError::non_retryable(
                            format!("response body is not valid JSON: {e}"),
                            attempt,
                            Some(response.status),
                        )
                    });
                }
                Ok(response) if self.policy.should_retry_status(response.status) => (
                    format!("upstream returned status {}", response.status),
                    Some(response.status),
                ),
                Ok(response) => {
                    return Err(FetchError::non_retryable(
                        format!("upstream returned status {}", response.status),
                        attempt,
                        Some(response.status),
                    ));
                }
                Err(error) if error.retryable() => {
                    (format!("transport error: {}", error.message()), None)
                }
                Err(error) => {
                    return Err(FetchError::non_retryable(
                        format!("transport error: {}", error.message()),
                        attempt,
                        None,
                    ));
                }
            };

            if attempt > max_retries {
                warn!(url = %request.url, attempts = attempt, %reason, "fetch retries exhausted");
                return Err(FetchError::exhausted(reason, attempt, status));
            }

            let delay = self.policy.delay_for_retry(attempt);
            warn!(
                url = %request.url,
                attempt,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "transient fetch failure, retrying"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}
