//! Prometheus exposition format support.
//!
//! Serves the latest scrape in the Prometheus text format so the service
//! graph can be scraped directly, without an OpenTelemetry collector in
//! between.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netlog_receiver::{Output, Receiver};
//! use netlog_receiver::prometheus::PrometheusConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PrometheusConfig::builder()
//!         .listen_addr("0.0.0.0:9464")
//!         .metrics_path("/metrics")
//!         .build();
//!
//!     let receiver = Receiver::builder()
//!         .output(Output::prometheus(config))
//!         .build();
//!
//!     // Metrics available at http://localhost:9464/metrics once started
//!     let _ingestor = receiver.ingestor();
//! }
//! ```

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use netlog_types::{MetricsSnapshot, METRIC_NAME};

/// Configuration for Prometheus metrics endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:9464")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
    /// Optional namespace prefix for all metrics
    pub namespace: Option<String>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9464".to_string(),
            metrics_path: "/metrics".to_string(),
            namespace: None,
        }
    }
}

impl PrometheusConfig {
    /// Create a new builder for PrometheusConfig.
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
    namespace: Option<String>,
}

impl PrometheusConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the metrics path.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Set the namespace prefix for all metrics.
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    /// Build the PrometheusConfig.
    pub fn build(self) -> PrometheusConfig {
        let defaults = PrometheusConfig::default();
        PrometheusConfig {
            listen_addr: self.listen_addr.unwrap_or(defaults.listen_addr),
            metrics_path: self.metrics_path.unwrap_or(defaults.metrics_path),
            namespace: self.namespace,
        }
    }
}

type SnapshotStorage = Arc<RwLock<Option<MetricsSnapshot>>>;

/// Prometheus exporter that serves the latest snapshot over HTTP.
#[derive(Debug)]
pub struct PrometheusExporter {
    config: PrometheusConfig,
    latest_snapshot: SnapshotStorage,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(config: PrometheusConfig) -> Self {
        Self {
            config,
            latest_snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PrometheusConfig {
        &self.config
    }

    /// Update the latest snapshot.
    pub fn record(&self, snapshot: &MetricsSnapshot) {
        *self.latest_snapshot.write() = Some(snapshot.clone());
    }

    /// Get the current metrics in Prometheus exposition format.
    pub fn render(&self) -> String {
        render_storage(&self.latest_snapshot, self.config.namespace.as_deref())
    }

    /// Start the HTTP server to serve Prometheus metrics.
    ///
    /// Spawns a background task that serves metrics at the configured path
    /// until `cancel` fires.
    pub fn start_server(&self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let listen_addr = self.config.listen_addr.clone();
        let metrics_path = self.config.metrics_path.clone();
        let namespace = self.config.namespace.clone();
        let snapshot_storage = self.latest_snapshot.clone();

        tokio::spawn(async move {
            if let Err(e) =
                run_server(listen_addr, metrics_path, namespace, snapshot_storage, cancel).await
            {
                error!(error = %e, "prometheus server error");
            }
        })
    }
}

async fn run_server(
    listen_addr: String,
    metrics_path: String,
    namespace: Option<String>,
    snapshot_storage: SnapshotStorage,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, path = %metrics_path, "prometheus endpoint listening");

    loop {
        let (stream, _) = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("prometheus server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };
        let io = TokioIo::new(stream);

        let metrics_path = metrics_path.clone();
        let namespace = namespace.clone();
        let snapshot_storage = snapshot_storage.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let response = handle_request(
                    req.uri().path(),
                    &metrics_path,
                    namespace.as_deref(),
                    &snapshot_storage,
                );
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(error = %e, "prometheus connection error");
            }
        });
    }
}

fn handle_request(
    path: &str,
    metrics_path: &str,
    namespace: Option<&str>,
    snapshot_storage: &SnapshotStorage,
) -> Response<Full<Bytes>> {
    if path == metrics_path {
        text_response(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            render_storage(snapshot_storage, namespace),
        )
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "text/plain", "OK".to_string())
    } else {
        text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string())
    }
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: String,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn render_storage(storage: &SnapshotStorage, namespace: Option<&str>) -> String {
    match storage.read().as_ref() {
        Some(s) => format_prometheus(s, namespace),
        None => String::new(),
    }
}

/// Format a snapshot as Prometheus exposition format.
///
/// One `traces_service_graph_request_total` sample per edge, labelled with
/// `client`, `server` and `client_address` (the source hostname). Distinct
/// source tokens that degrade to the same labels (two IPv6 sources, or `""`
/// and `"a:b:c"`, calling one destination) share a single series.
pub fn format_prometheus(snapshot: &MetricsSnapshot, namespace: Option<&str>) -> String {
    let mut output = String::new();
    let prefix = namespace.map(|n| format!("{}_", n)).unwrap_or_default();

    let _ = writeln!(
        output,
        "# HELP {}{} Observed source to destination connections",
        prefix, METRIC_NAME
    );
    let _ = writeln!(output, "# TYPE {}{} counter", prefix, METRIC_NAME);

    let series: BTreeSet<(&str, &str, &str)> = snapshot
        .edges
        .iter()
        .map(|e| {
            (
                e.source_ip.as_str(),
                e.destination_ip.as_str(),
                e.source_hostname.as_str(),
            )
        })
        .collect();

    for (client, server, client_address) in series {
        let _ = writeln!(
            output,
            "{}{}{{client=\"{}\",server=\"{}\",client_address=\"{}\"}} 1",
            prefix,
            METRIC_NAME,
            escape_label_value(client),
            escape_label_value(server),
            escape_label_value(client_address),
        );
    }

    let _ = writeln!(
        output,
        "# HELP {}netlog_snapshot_timestamp_seconds Unix timestamp of the snapshot",
        prefix
    );
    let _ = writeln!(
        output,
        "# TYPE {}netlog_snapshot_timestamp_seconds gauge",
        prefix
    );
    let _ = writeln!(
        output,
        "{}netlog_snapshot_timestamp_seconds {:.3}",
        prefix,
        snapshot.timestamp_ms as f64 / 1000.0
    );

    output
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
