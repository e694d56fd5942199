//! The Receiver: owns the store, starts the sniffer feed and drives scrapes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netlog_types::MetricsSnapshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ReceiverConfig;
use crate::error::{FeedError, ReceiverError};
use crate::ingestor::{Ingestor, Reporter};
use crate::output::Output;
use crate::scraper::Scraper;
use crate::sniffer::Sniffer;
use crate::store::AggregationStore;

/// The main entry point for a network topology receiver.
///
/// A Receiver owns one [`AggregationStore`], hands an [`Ingestor`] to the
/// sniffer feed, and periodically scrapes the store into every configured
/// output.
///
/// # Example
///
/// ```rust,no_run
/// use netlog_receiver::{ChannelSniffer, Output, Receiver};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let receiver = Receiver::builder()
///         .output(Output::file("topology.json"))
///         .interval(Duration::from_secs(10))
///         .build();
///
///     let (_feed, sniffer) = ChannelSniffer::create(64, "in-process");
///
///     // Returns immediately; the feed runs on its own task
///     let running = receiver.start(sniffer).unwrap();
///
///     tokio::time::sleep(Duration::from_secs(30)).await;
///     running.stop().await.unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct Receiver {
    ingestor: Ingestor,
    scraper: Scraper,
    outputs: Arc<Vec<Output>>,
    config: ReceiverConfig,
    started: AtomicBool,
}

impl Receiver {
    /// Create a receiver with a fresh store, no outputs and the default
    /// collection interval.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the receiver.
    pub fn builder() -> ReceiverBuilder {
        ReceiverBuilder::new()
    }

    /// The ingestor feeding this receiver's store.
    ///
    /// Report calls made through it are visible to the next scrape.
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// The store shared by the ingestor and the scraper.
    pub fn store(&self) -> &Arc<AggregationStore> {
        self.ingestor.store()
    }

    /// The active configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Take one snapshot of the current store without emitting it.
    pub fn scrape(&self) -> MetricsSnapshot {
        self.scraper.scrape()
    }

    /// Scrape and emit to all outputs immediately.
    pub async fn emit_now(&self) -> MetricsSnapshot {
        let snapshot = self.scraper.scrape();
        emit_to_outputs(&self.outputs, &snapshot).await;
        snapshot
    }

    /// Launch the sniffer feed and the scrape scheduler.
    ///
    /// Returns as soon as both tasks are spawned, without waiting for the
    /// feed to report anything. A receiver starts at most once; later calls
    /// return [`ReceiverError::AlreadyStarted`] and drop `sniffer` unused.
    ///
    /// Prometheus outputs start their HTTP servers here.
    pub fn start<S: Sniffer>(&self, sniffer: S) -> Result<RunningReceiver, ReceiverError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ReceiverError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();

        #[allow(unused_mut)]
        let mut servers = Vec::new();
        #[cfg(feature = "prometheus")]
        for output in self.outputs.iter() {
            if let Output::Prometheus(exporter) = output {
                servers.push(exporter.start_server(cancel.child_token()));
            }
        }

        let feed = spawn_feed(
            sniffer,
            Arc::new(self.ingestor.clone()),
            cancel.child_token(),
        );
        let scheduler = tokio::spawn(run_scheduler(
            self.scraper.clone(),
            self.outputs.clone(),
            self.config.collection_interval,
            cancel.child_token(),
        ));

        info!(
            interval = ?self.config.collection_interval,
            outputs = self.outputs.len(),
            "receiver started"
        );

        Ok(RunningReceiver {
            cancel,
            feed: Some(feed),
            scheduler,
            servers,
        })
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a Receiver.
#[derive(Debug, Default)]
pub struct ReceiverBuilder {
    store: Option<Arc<AggregationStore>>,
    outputs: Vec<Output>,
    config: Option<ReceiverConfig>,
    interval: Option<Duration>,
}

impl ReceiverBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing store instead of creating a fresh one.
    pub fn store(mut self, store: Arc<AggregationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; every snapshot is emitted to all of
    /// them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Use a full configuration.
    pub fn config(mut self, config: ReceiverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the collection interval. Takes precedence over `config`.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Build the receiver.
    pub fn build(self) -> Receiver {
        let mut config = self.config.unwrap_or_default();
        if let Some(interval) = self.interval {
            config = ReceiverConfig::builder()
                .collection_interval(interval)
                .build();
        }

        let store = self.store.unwrap_or_default();

        Receiver {
            ingestor: Ingestor::new(store.clone()),
            scraper: Scraper::new(store),
            outputs: Arc::new(self.outputs),
            config,
            started: AtomicBool::new(false),
        }
    }
}

/// Handle to a started receiver.
///
/// Dropping the handle leaves the background tasks running until the
/// runtime shuts down; call [`stop`](Self::stop) to cancel and join them.
#[derive(Debug)]
pub struct RunningReceiver {
    cancel: CancellationToken,
    feed: Option<JoinHandle<Result<(), FeedError>>>,
    scheduler: JoinHandle<()>,
    servers: Vec<JoinHandle<()>>,
}

impl RunningReceiver {
    /// Wait for the sniffer feed to end on its own.
    ///
    /// Resolves with the feed's outcome the first time it ends; afterwards
    /// it resolves to `Ok(())` immediately. Cancel safe, so it can sit in a
    /// `tokio::select!` next to a shutdown signal.
    pub async fn feed_finished(&mut self) -> Result<(), ReceiverError> {
        let Some(feed) = self.feed.as_mut() else {
            return Ok(());
        };
        let joined = feed.await;
        self.feed = None;
        flatten_feed(joined)
    }

    /// True once the feed task is no longer running.
    pub fn is_feed_finished(&self) -> bool {
        self.feed.as_ref().map_or(true, |f| f.is_finished())
    }

    /// The token cancelled by [`stop`](Self::stop). Child tokens can be
    /// handed to host tasks that should stop with the receiver.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every background task and wait for all of them to finish.
    ///
    /// Returns the feed's outcome if it had not already been collected by
    /// [`feed_finished`](Self::feed_finished).
    pub async fn stop(mut self) -> Result<(), ReceiverError> {
        debug!("stopping receiver");
        self.cancel.cancel();

        let feed_result = match self.feed.take() {
            Some(feed) => flatten_feed(feed.await),
            None => Ok(()),
        };

        if let Err(e) = self.scheduler.await {
            warn!(error = %e, "scrape scheduler did not shut down cleanly");
        }
        for server in self.servers {
            if let Err(e) = server.await {
                warn!(error = %e, "metrics server did not shut down cleanly");
            }
        }

        info!("receiver stopped");
        feed_result
    }
}

fn flatten_feed(
    joined: Result<Result<(), FeedError>, tokio::task::JoinError>,
) -> Result<(), ReceiverError> {
    joined?.map_err(ReceiverError::from)
}

fn spawn_feed<S: Sniffer>(
    mut sniffer: S,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
) -> JoinHandle<Result<(), FeedError>> {
    tokio::spawn(async move {
        let description = sniffer.description().to_string();
        info!(feed = %description, "sniffer feed started");

        let result = sniffer.run_forever(reporter, cancel).await;
        match &result {
            Ok(()) => info!(feed = %description, "sniffer feed ended"),
            Err(e) => error!(feed = %description, error = %e, "sniffer feed failed"),
        }
        result
    })
}

async fn run_scheduler(
    scraper: Scraper,
    outputs: Arc<Vec<Output>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = scraper.scrape();
                debug!(edges = snapshot.len(), "scraped store");
                emit_to_outputs(&outputs, &snapshot).await;
            }
        }
    }

    debug!("scrape scheduler stopped");
}

async fn emit_to_outputs(outputs: &[Output], snapshot: &MetricsSnapshot) {
    for output in outputs {
        if let Err(e) = output.emit(snapshot).await {
            warn!(output = output.kind(), error = %e, "failed to emit snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniffer::{ChannelSniffer, FeedMessage};
    use async_trait::async_trait;
    use netlog_types::{CaptureResults, ResultRecord};

    struct FailingSniffer;

    #[async_trait]
    impl Sniffer for FailingSniffer {
        async fn run_forever(
            &mut self,
            _reporter: Arc<dyn Reporter>,
            _cancel: CancellationToken,
        ) -> Result<(), FeedError> {
            Err(FeedError::Sniffer("capture device vanished".to_string()))
        }

        fn description(&self) -> &str {
            "failing"
        }
    }

    struct PanickingSniffer;

    #[async_trait]
    impl Sniffer for PanickingSniffer {
        async fn run_forever(
            &mut self,
            _reporter: Arc<dyn Reporter>,
            _cancel: CancellationToken,
        ) -> Result<(), FeedError> {
            panic!("sniffer bug");
        }

        fn description(&self) -> &str {
            "panicking"
        }
    }

    fn capture(token: &str, dests: &[&str]) -> FeedMessage {
        FeedMessage::Capture(CaptureResults::new(vec![ResultRecord::new(
            token,
            dests.iter().copied(),
        )]))
    }

    #[test]
    fn test_builder() {
        let receiver = Receiver::builder()
            .output(Output::file("test.json"))
            .interval(Duration::from_millis(500))
            .build();

        assert_eq!(receiver.config.collection_interval, Duration::from_millis(500));
        assert_eq!(receiver.outputs.len(), 1);
    }

    #[test]
    fn default_interval_is_ten_seconds() {
        let receiver = Receiver::new();
        assert_eq!(receiver.config().collection_interval, Duration::from_secs(10));
        assert!(receiver.outputs.is_empty());
    }

    #[test]
    fn builder_uses_injected_store() {
        let store = Arc::new(AggregationStore::new());
        store.upsert("10.0.0.1:podA", "10.0.0.2");

        let receiver = Receiver::builder().store(store.clone()).build();

        assert!(Arc::ptr_eq(receiver.store(), &store));
        assert_eq!(receiver.scrape().len(), 1);
    }

    #[test]
    fn ingestor_and_scrape_share_state() {
        let receiver = Receiver::new();
        receiver
            .ingestor()
            .report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
                "10.0.0.1:podA",
                ["10.0.0.2", "10.0.0.3"],
            )]));

        assert_eq!(receiver.scrape().len(), 2);
        assert_eq!(receiver.scrape().len(), 2);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let receiver = Receiver::new();
        let (_tx, first) = ChannelSniffer::create(1, "first");
        let (_tx2, second) = ChannelSniffer::create(1, "second");

        let running = receiver.start(first).unwrap();
        let err = receiver.start(second).unwrap_err();
        assert!(matches!(err, ReceiverError::AlreadyStarted));

        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_cancels_and_joins_feed() {
        let receiver = Receiver::new();
        // Keep the sender alive so only cancellation can end the feed
        let (_tx, sniffer) = ChannelSniffer::create(1, "idle");

        let running = receiver.start(sniffer).unwrap();
        assert!(!running.is_feed_finished());

        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn feed_reports_reach_the_store() {
        let receiver = Receiver::new();
        let (tx, sniffer) = ChannelSniffer::create(4, "test");

        let mut running = receiver.start(sniffer).unwrap();
        tx.send(capture("10.0.0.1:podA", &["d1", "d2", "d1"]))
            .await
            .unwrap();
        drop(tx);

        running.feed_finished().await.unwrap();
        assert_eq!(receiver.scrape().len(), 2);

        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn feed_error_is_reported_to_host() {
        let receiver = Receiver::new();
        let mut running = receiver.start(FailingSniffer).unwrap();

        let err = running.feed_finished().await.unwrap_err();
        assert!(err.is_feed_failure());
        assert!(err.to_string().contains("capture device vanished"));

        // Already collected, so stop is clean
        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn feed_error_returned_from_stop_when_not_collected() {
        let receiver = Receiver::new();
        let running = receiver.start(FailingSniffer).unwrap();

        let err = running.stop().await.unwrap_err();
        assert!(matches!(err, ReceiverError::Feed(FeedError::Sniffer(_))));
    }

    #[tokio::test]
    async fn feed_panic_is_reported_as_error() {
        let receiver = Receiver::new();
        let mut running = receiver.start(PanickingSniffer).unwrap();

        let err = running.feed_finished().await.unwrap_err();
        assert!(matches!(err, ReceiverError::FeedPanicked(_)));

        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn scheduler_emits_to_channel_output() {
        let (output, mut rx) = Output::channel(16);
        let receiver = Receiver::builder()
            .output(output)
            .interval(Duration::from_millis(10))
            .build();
        receiver
            .ingestor()
            .report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
                "10.0.0.1:podA",
                ["10.0.0.2"],
            )]));

        let (_tx, sniffer) = ChannelSniffer::create(1, "idle");
        let running = receiver.start(sniffer).unwrap();

        // First tick fires immediately, the next one after the interval
        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first.edges[0].destination_ip, "10.0.0.2");

        running.stop().await.unwrap();
    }

    #[tokio::test]
    async fn emit_now_delivers_current_state() {
        let (output, mut rx) = Output::channel(1);
        let receiver = Receiver::builder().output(output).build();
        receiver
            .ingestor()
            .report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
                "a:b",
                ["d1"],
            )]));

        let emitted = receiver.emit_now().await;

        assert_eq!(rx.recv().await.unwrap(), emitted);
        assert_eq!(emitted.len(), 1);
    }

    #[tokio::test]
    async fn failing_output_does_not_stop_scheduler() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (output, mut rx) = Output::channel(16);
        let receiver = Receiver::builder()
            .output(Output::tcp(addr.to_string()))
            .output(output)
            .interval(Duration::from_millis(10))
            .build();

        let (_tx, sniffer) = ChannelSniffer::create(1, "idle");
        let running = receiver.start(sniffer).unwrap();

        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }

        running.stop().await.unwrap();
    }
}
