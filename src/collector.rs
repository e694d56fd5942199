//! Wiring between settings, the sniffer feed and the receiver.

use anyhow::{Context, Result};
use netlog_receiver::{LineSniffer, Output, Receiver, ReceiverError, RunningReceiver};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tracing::{error, info, warn};

use crate::duration::format_duration;
use crate::settings::{FeedSettings, Settings};

/// Byte stream carrying NDJSON report batches.
pub type FeedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Build a receiver with every output named in `settings`.
pub fn build_receiver(settings: &Settings) -> Result<Receiver> {
    let interval = settings.collection_interval()?;
    let mut builder = Receiver::builder().interval(interval);

    if let Some(path) = &settings.output.file {
        builder = builder.output(Output::file(path));
    }
    if let Some(addr) = &settings.output.tcp {
        builder = builder.output(Output::tcp(addr.clone()));
    }

    #[cfg(feature = "otel")]
    if let Some(endpoint) = &settings.output.otel_endpoint {
        let config = netlog_receiver::otel::OtelConfig::builder()
            .endpoint(endpoint.clone())
            .export_interval(interval)
            .build();
        let output = Output::otel(config)
            .map_err(|e| anyhow::anyhow!("failed to create OTLP exporter: {}", e))?;
        builder = builder.output(output);
    }
    #[cfg(feature = "otel")]
    if let Some(endpoint) = &settings.output.trace_endpoint {
        let config = netlog_receiver::otel::OtelConfig::builder()
            .endpoint(endpoint.clone())
            .build();
        builder = builder.output(Output::traces(config));
    }
    #[cfg(not(feature = "otel"))]
    if settings.output.otel_endpoint.is_some() {
        warn!("output.otel_endpoint is set but this build lacks the `otel` feature; ignoring");
    }
    #[cfg(not(feature = "otel"))]
    if settings.output.trace_endpoint.is_some() {
        warn!("output.trace_endpoint is set but this build lacks the `otel` feature; ignoring");
    }

    #[cfg(feature = "prometheus")]
    if let Some(listen) = &settings.output.prometheus_listen {
        let config = netlog_receiver::prometheus::PrometheusConfig::builder()
            .listen_addr(listen.clone())
            .build();
        builder = builder.output(Output::prometheus(config));
    }
    #[cfg(not(feature = "prometheus"))]
    if settings.output.prometheus_listen.is_some() {
        warn!("output.prometheus_listen is set but this build lacks the `prometheus` feature; ignoring");
    }

    Ok(builder.build())
}

/// Open the configured feed: a TCP connection, or stdin.
pub async fn open_feed(feed: &FeedSettings) -> Result<LineSniffer<FeedReader>> {
    match &feed.connect {
        Some(addr) => {
            info!(%addr, "connecting to sniffer feed");
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("failed to connect to {}", addr))?;
            Ok(LineSniffer::new(Box::new(stream) as FeedReader, addr))
        }
        None => Ok(LineSniffer::new(
            Box::new(tokio::io::stdin()) as FeedReader,
            "stdin",
        )),
    }
}

/// Run until ctrl-c, or until the feed fails.
///
/// A clean end of feed keeps the receiver serving the topology it has
/// collected. A feed error is logged and returned so the process exits
/// non-zero.
pub async fn run(settings: &Settings) -> Result<()> {
    let receiver = build_receiver(settings)?;
    let sniffer = open_feed(&settings.feed).await?;

    info!(
        interval = %format_duration(receiver.config().collection_interval),
        "starting collector"
    );
    let mut running = receiver.start(sniffer)?;

    let feed_outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            None
        }
        result = running.feed_finished() => Some(result),
    };

    match feed_outcome {
        None => info!("shutdown requested"),
        Some(Ok(())) => {
            info!("sniffer feed ended; serving collected topology until shutdown");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
        }
        Some(Err(e)) => return fail(running, e).await,
    }

    running.stop().await?;
    Ok(())
}

/// Ingest the whole feed, emit one snapshot to the outputs and return it.
pub async fn run_once(settings: &Settings) -> Result<netlog_receiver::MetricsSnapshot> {
    let receiver = build_receiver(settings)?;
    let sniffer = open_feed(&settings.feed).await?;

    let mut running = receiver.start(sniffer)?;
    if let Err(e) = running.feed_finished().await {
        return fail(running, e).await;
    }
    running.stop().await?;

    Ok(receiver.emit_now().await)
}

async fn fail<T>(running: RunningReceiver, err: ReceiverError) -> Result<T> {
    error!(error = %err, "sniffer feed terminated");
    if let Err(stop_err) = running.stop().await {
        warn!(error = %stop_err, "error while stopping receiver");
    }
    Err(err).context("sniffer feed terminated")
}
