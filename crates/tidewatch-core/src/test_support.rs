//! Scripted transport and sleeper fakes shared by unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::retry::Sleeper;

/// Replays a fixed script of responses and records every request.
#[derive(Debug)]
pub(crate) struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    fallback: Option<Result<HttpResponse, HttpError>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
    closes: AtomicUsize,
}

impl ScriptedHttpClient {
    pub(crate) fn new(script: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            closes: AtomicUsize::new(0),
        }
    }

    /// Answers every request with the same outcome.
    pub(crate) fn repeating(outcome: Result<HttpResponse, HttpError>) -> Self {
        Self {
            fallback: Some(outcome),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        let outcome = self
            .script
            .lock()
            .expect("script should not be poisoned")
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(HttpError::other("scripted client has no response left")));
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome
        })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records requested delays without waiting.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn recorded(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .expect("delay store should not be poisoned")
            .clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.delays
            .lock()
            .expect("delay store should not be poisoned")
            .push(duration);
        Box::pin(async {})
    }
}
