//! Output backends for emitting snapshots.

use std::path::PathBuf;
#[cfg(any(feature = "otel", feature = "prometheus"))]
use std::sync::Arc;

use netlog_types::MetricsSnapshot;

#[cfg(feature = "otel")]
use crate::otel::{OtelConfig, OtelExporter, TraceExporter};

#[cfg(feature = "prometheus")]
use crate::prometheus::{PrometheusConfig, PrometheusExporter};

/// Output destination for snapshots.
///
/// Configure where the receiver should deliver each scrape.
#[derive(Debug)]
pub enum Output {
    /// Write snapshots to a JSON file.
    ///
    /// The file is overwritten with each snapshot.
    File(PathBuf),

    /// Send snapshots to a TCP server.
    ///
    /// Each snapshot is sent as a newline-delimited JSON message.
    Tcp(String),

    /// Send snapshots through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(tokio::sync::mpsc::Sender<MetricsSnapshot>),

    /// Export snapshots as OpenTelemetry metrics via OTLP.
    ///
    /// Use `Output::otel()` to create this variant.
    #[cfg(feature = "otel")]
    Otel(Arc<OtelExporter>),

    /// Export synthetic traces built from the topology via OTLP.
    ///
    /// Use `Output::traces()` to create this variant.
    #[cfg(feature = "otel")]
    Traces(Arc<TraceExporter>),

    /// Serve the latest snapshot in Prometheus exposition format.
    ///
    /// Use `Output::prometheus()` to create this variant.
    #[cfg(feature = "prometheus")]
    Prometheus(Arc<PrometheusExporter>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use netlog_receiver::Output;
    ///
    /// let output = Output::file("topology.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use netlog_receiver::Output;
    ///
    /// let output = Output::tcp("localhost:9090");
    /// ```
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use netlog_receiver::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive snapshots
    /// // while let Some(snapshot) = rx.recv().await {
    /// //     println!("Got snapshot with {} edges", snapshot.len());
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<MetricsSnapshot>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Create an OpenTelemetry OTLP output.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use netlog_receiver::Output;
    /// use netlog_receiver::otel::OtelConfig;
    ///
    /// let config = OtelConfig::builder()
    ///     .endpoint("http://localhost:4318")
    ///     .service_name("netlog")
    ///     .build();
    ///
    /// let output = Output::otel(config).expect("Failed to create OTLP exporter");
    /// ```
    #[cfg(feature = "otel")]
    pub fn otel(config: OtelConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let exporter = OtelExporter::new(&config)?;
        Ok(Output::Otel(Arc::new(exporter)))
    }

    /// Create a synthetic trace output.
    ///
    /// Every scrape emits one trace per root of the observed service graph.
    ///
    /// # Example
    ///
    /// ```rust
    /// use netlog_receiver::Output;
    /// use netlog_receiver::otel::OtelConfig;
    ///
    /// let config = OtelConfig::builder().endpoint("http://localhost:4318").build();
    /// let output = Output::traces(config);
    /// assert_eq!(output.kind(), "traces");
    /// ```
    #[cfg(feature = "otel")]
    pub fn traces(config: OtelConfig) -> Self {
        Output::Traces(Arc::new(TraceExporter::new(&config)))
    }

    /// Create a Prometheus output.
    ///
    /// The HTTP server starts when the receiver starts.
    #[cfg(feature = "prometheus")]
    pub fn prometheus(config: PrometheusConfig) -> Self {
        Output::Prometheus(Arc::new(PrometheusExporter::new(config)))
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Output::File(_) => "file",
            Output::Tcp(_) => "tcp",
            Output::Channel(_) => "channel",
            #[cfg(feature = "otel")]
            Output::Otel(_) => "otel",
            #[cfg(feature = "otel")]
            Output::Traces(_) => "traces",
            #[cfg(feature = "prometheus")]
            Output::Prometheus(_) => "prometheus",
        }
    }

    /// Emit a snapshot to this output.
    pub(crate) async fn emit(&self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(snapshot)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Tcp(addr) => {
                use tokio::io::AsyncWriteExt;
                use tokio::net::TcpStream;

                let mut stream = TcpStream::connect(addr).await?;
                let mut json = serde_json::to_vec(snapshot)?;
                json.push(b'\n');
                stream.write_all(&json).await?;
            }
            Output::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                let _ = tx.try_send(snapshot.clone());
            }
            #[cfg(feature = "otel")]
            Output::Otel(exporter) => {
                exporter.record(snapshot);
            }
            #[cfg(feature = "otel")]
            Output::Traces(exporter) => {
                let exporter = exporter.clone();
                let snapshot = snapshot.clone();
                let spans = tokio::task::spawn_blocking(move || exporter.export(&snapshot))
                    .await
                    .map_err(std::io::Error::other)?
                    .map_err(std::io::Error::other)?;
                tracing::debug!(spans, "emitted synthetic traces");
            }
            #[cfg(feature = "prometheus")]
            Output::Prometheus(exporter) => {
                exporter.record(snapshot);
            }
        }
        Ok(())
    }
}
