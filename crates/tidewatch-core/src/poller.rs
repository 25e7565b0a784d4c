//! Periodic feed refresh and the process-level service owning pollers and the connection pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::CacheMode;
use crate::config::Settings;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::orchestrator::{FetchResult, Orchestrator};
use crate::{FeedKey, Provenance};

/// Shortest period a poller ticks at; a zero interval is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns interval-driven refreshes of one feed.
pub struct Poller;

impl Poller {
    /// Starts polling `key` every `interval`, beginning immediately.
    ///
    /// A result is published when its record differs from the last published one. Backup
    /// records are only published while nothing else has been.
    pub fn spawn(orchestrator: Arc<Orchestrator>, key: FeedKey, interval: Duration) -> PollerHandle {
        let (sender, receiver) = watch::channel(None);
        let task_key = key.clone();
        if interval < MIN_POLL_INTERVAL {
            warn!(feed = %key, ?interval, "poll interval too short; using the minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);

        let task = tokio::spawn(async move {
            info!(feed = %task_key, interval_secs = interval.as_secs(), "poller started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_published: Option<String> = None;

            loop {
                ticker.tick().await;
                let result = orchestrator
                    .fetch_feed_with(&task_key, CacheMode::Refresh)
                    .await;
                let record_id = result.record.record_id();

                let publish = match (&last_published, result.source) {
                    (None, _) => true,
                    (Some(_), Provenance::Backup) => false,
                    (Some(last), _) => *last != record_id,
                };
                if !publish {
                    debug!(feed = %task_key, source = result.source.as_str(), "no new report");
                    continue;
                }

                info!(
                    feed = %task_key,
                    source = result.source.as_str(),
                    %record_id,
                    "publishing report"
                );
                last_published = Some(record_id);
                if sender.send(Some(result)).is_err() {
                    debug!(feed = %task_key, "all subscribers gone; poller stopping");
                    break;
                }
            }
        });

        PollerHandle {
            key,
            receiver,
            task,
        }
    }
}

/// Owns a running poller; dropping it cancels the task.
#[derive(Debug)]
pub struct PollerHandle {
    key: FeedKey,
    receiver: watch::Receiver<Option<FetchResult>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Receiver of published results; holds `None` until the first tick completes.
    pub fn subscribe(&self) -> watch::Receiver<Option<FetchResult>> {
        self.receiver.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn shutdown(&self) {
        if !self.task.is_finished() {
            info!(feed = %self.key, "poller stopped");
        }
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Request path and pollers sharing one orchestrator, one cache and one connection pool.
///
/// Dropping the service cancels every poller and closes the pool.
pub struct IngestService {
    orchestrator: Arc<Orchestrator>,
    client: Arc<dyn HttpClient>,
    pollers: Vec<PollerHandle>,
}

impl IngestService {
    /// Builds a service over a reqwest-backed connection pool.
    pub fn from_settings(settings: Settings) -> Self {
        Self::new(settings, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn new(settings: Settings, client: Arc<dyn HttpClient>) -> Self {
        let orchestrator = Orchestrator::new(settings, Arc::clone(&client));
        Self::with_orchestrator(Arc::new(orchestrator), client)
    }

    /// Wraps a prepared orchestrator; `client` must be the transport it was built with.
    pub fn with_orchestrator(orchestrator: Arc<Orchestrator>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            orchestrator,
            client,
            pollers: Vec::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub async fn fetch_feed(&self, key: &FeedKey) -> FetchResult {
        self.orchestrator.fetch_feed(key).await
    }

    /// Starts a poller for `key` and returns its subscription.
    pub fn watch(&mut self, key: FeedKey, interval: Duration) -> watch::Receiver<Option<FetchResult>> {
        let handle = Poller::spawn(Arc::clone(&self.orchestrator), key, interval);
        let receiver = handle.subscribe();
        self.pollers.push(handle);
        receiver
    }

    /// Number of pollers started and not yet finished.
    pub fn active_pollers(&self) -> usize {
        self.pollers.iter().filter(|poller| !poller.is_finished()).count()
    }

    /// Cancels every poller and closes the connection pool.
    pub fn shutdown(self) {
        info!(pollers = self.pollers.len(), "ingest service shutting down");
        drop(self);
    }
}

impl Drop for IngestService {
    fn drop(&mut self) {
        for poller in self.pollers.drain(..) {
            poller.shutdown();
        }
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::test_support::{RecordingSleeper, ScriptedHttpClient};
    use crate::Feed;

    fn quake(number: u32) -> Result<HttpResponse, HttpError> {
        Ok(HttpResponse::ok_json(format!(
            r#"{{"records":{{"Earthquake":[{{
                "EarthquakeNo": {number},
                "ReportContent": "有感地震",
                "EarthquakeInfo": {{"OriginTime": "2026-10-16 08:12:41", "Epicenter": {{"Location": "花蓮縣近海"}}}}
            }}]}}}}"#
        )))
    }

    fn orchestrator(client: Arc<ScriptedHttpClient>) -> Arc<Orchestrator> {
        let settings = Settings::default().with_max_retries(0);
        Arc::new(
            Orchestrator::new(settings, client).with_sleeper(Arc::new(RecordingSleeper::default())),
        )
    }

    async fn next_report(receiver: &mut watch::Receiver<Option<FetchResult>>) -> FetchResult {
        tokio::time::timeout(Duration::from_secs(2), receiver.changed())
            .await
            .expect("poller should publish within the deadline")
            .expect("poller should still be running");
        receiver.borrow_and_update().clone().expect("published value")
    }

    #[tokio::test]
    async fn publishes_only_when_the_report_changes() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            quake(1001),
            quake(1001),
            quake(1002),
        ]));
        let key = FeedKey::plain(Feed::SeismicNormal).unwrap();
        let handle = Poller::spawn(orchestrator(client.clone()), key, Duration::from_millis(10));
        let mut receiver = handle.subscribe();

        let first = next_report(&mut receiver).await;
        let second = next_report(&mut receiver).await;

        assert_eq!(first.record.record_id(), "1001");
        assert_eq!(first.source, Provenance::Live);
        assert_eq!(second.record.record_id(), "1002");

        // Exhausted script: every later tick serves the stale 1002 entry, which is not new.
        let quiet = tokio::time::timeout(Duration::from_millis(100), receiver.changed()).await;
        assert!(quiet.is_err());
        assert!(client.recorded_requests().len() >= 4);
        handle.shutdown();
    }

    #[tokio::test]
    async fn first_tick_publishes_backup_when_nothing_is_available() {
        let client = Arc::new(ScriptedHttpClient::repeating(Err(HttpError::other("offline"))));
        let key = FeedKey::plain(Feed::Tsunami).unwrap();
        let handle = Poller::spawn(orchestrator(client), key, Duration::from_millis(10));
        let mut receiver = handle.subscribe();

        let report = next_report(&mut receiver).await;

        assert_eq!(report.source, Provenance::Backup);
        assert!(crate::backup::is_backup_id(&report.record.record_id()));
        let repeat = tokio::time::timeout(Duration::from_millis(100), receiver.changed()).await;
        assert!(repeat.is_err());
    }

    #[tokio::test]
    async fn zero_interval_is_raised_instead_of_killing_the_poller() {
        let client = Arc::new(ScriptedHttpClient::repeating(quake(7)));
        let key = FeedKey::plain(Feed::SeismicNormal).unwrap();
        let handle = Poller::spawn(orchestrator(client), key, Duration::ZERO);
        let mut receiver = handle.subscribe();

        let report = next_report(&mut receiver).await;

        assert_eq!(report.record.record_id(), "7");
        assert!(!handle.is_finished());
        handle.shutdown();
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_polling() {
        let client = Arc::new(ScriptedHttpClient::repeating(quake(7)));
        let key = FeedKey::plain(Feed::SeismicNormal).unwrap();
        let handle = Poller::spawn(orchestrator(client.clone()), key, Duration::from_millis(5));
        let mut receiver = handle.subscribe();
        next_report(&mut receiver).await;

        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = client.recorded_requests().len();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.recorded_requests().len(), settled);
    }

    #[tokio::test]
    async fn service_shutdown_stops_pollers_and_closes_the_pool() {
        let client = Arc::new(ScriptedHttpClient::repeating(quake(9)));
        let mut service = IngestService::new(Settings::default(), client.clone());
        let mut receiver = service.watch(
            FeedKey::plain(Feed::SeismicNormal).unwrap(),
            Duration::from_millis(10),
        );
        next_report(&mut receiver).await;
        assert_eq!(service.active_pollers(), 1);

        service.shutdown();

        assert_eq!(client.close_count(), 1);
    }

    #[tokio::test]
    async fn dropping_the_service_closes_the_pool() {
        let client = Arc::new(ScriptedHttpClient::repeating(quake(9)));
        {
            let service = IngestService::new(Settings::default(), client.clone());
            let result = service
                .fetch_feed(&FeedKey::plain(Feed::SeismicNormal).unwrap())
                .await;
            assert_eq!(result.source, Provenance::Live);
        }

        assert_eq!(client.close_count(), 1);
    }
}
