//! OpenTelemetry integration for service-graph snapshots.
//!
//! This module exports the latest scrape as an OTLP observable counter named
//! `traces_service_graph_request_total`, one data point per edge.
//!
//! [`TraceExporter`] turns the same topology into synthetic traces: one
//! SERVER span per node, nested along observed calls, each under a resource
//! named after the node's service.
//!
//! # Example
//!
//! ```rust,no_run
//! use netlog_receiver::{Output, Receiver};
//! use netlog_receiver::otel::OtelConfig;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let otel_config = OtelConfig::builder()
//!         .endpoint("http://localhost:4318")
//!         .service_name("netlog")
//!         .build();
//!
//!     let receiver = Receiver::builder()
//!         .output(Output::otel(otel_config).unwrap())
//!         .interval(Duration::from_secs(10))
//!         .build();
//!
//!     let _ingestor = receiver.ingestor();
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::{Meter, MeterProvider, ObservableCounter};
use opentelemetry::trace::{Span, SpanKind, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use netlog_types::{MetricsSnapshot, METRIC_NAME, SCOPE_NAME};

use crate::service_graph::{ServiceGraph, SpanNode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for OpenTelemetry export.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    /// OTLP endpoint (e.g., "http://localhost:4318")
    pub endpoint: String,
    /// Service name for metrics attribution
    pub service_name: String,
    /// How often the SDK pushes the latest snapshot
    pub export_interval: Duration,
}

impl OtelConfig {
    /// Create a new builder for OtelConfig.
    pub fn builder() -> OtelConfigBuilder {
        OtelConfigBuilder::default()
    }
}

/// Builder for OtelConfig.
#[derive(Debug, Default)]
pub struct OtelConfigBuilder {
    endpoint: Option<String>,
    service_name: Option<String>,
    export_interval: Option<Duration>,
}

impl OtelConfigBuilder {
    /// Set the OTLP endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the service name.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the push interval. Usually matches the collection interval.
    pub fn export_interval(mut self, interval: Duration) -> Self {
        self.export_interval = Some(interval);
        self
    }

    /// Build the OtelConfig.
    pub fn build(self) -> OtelConfig {
        OtelConfig {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| "http://localhost:4318".to_string()),
            service_name: self.service_name.unwrap_or_else(|| "netlog".to_string()),
            export_interval: self.export_interval.unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// OpenTelemetry exporter for service-graph snapshots.
///
/// Each recorded snapshot replaces the previous one. The SDK reads it back
/// through an observable counter callback on every export cycle, so every
/// edge is reported with its absolute value of 1.
///
/// The SDK resource is per provider, so the per-edge resource attributes
/// (`client.socket.address`, `client.address`, `server.socket.address`) are
/// attached to each data point alongside `client` and `server`.
pub struct OtelExporter {
    meter: Meter,
    _provider: Arc<SdkMeterProvider>,
    _requests: ObservableCounter<u64>,
    latest_snapshot: Arc<RwLock<Option<MetricsSnapshot>>>,
}

impl OtelExporter {
    /// Create a new OtelExporter with the given configuration.
    pub fn new(config: &OtelConfig) -> Result<Self, BoxError> {
        use opentelemetry_otlp::MetricExporter;
        use opentelemetry_sdk::metrics::PeriodicReader;
        use opentelemetry_sdk::Resource;

        let exporter = MetricExporter::builder()
            .with_http()
            .with_endpoint(format!("{}/v1/metrics", config.endpoint))
            .build()?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(config.export_interval)
            .build();

        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        let meter = provider.meter(SCOPE_NAME);
        let provider = Arc::new(provider);

        let latest_snapshot: Arc<RwLock<Option<MetricsSnapshot>>> = Arc::new(RwLock::new(None));
        let storage = latest_snapshot.clone();

        let requests = meter
            .u64_observable_counter(METRIC_NAME)
            .with_description("Observed source to destination connections")
            .with_callback(move |observer| {
                let latest = storage.read();
                let Some(snapshot) = latest.as_ref() else {
                    return;
                };
                for edge in &snapshot.edges {
                    observer.observe(edge.value, &edge_attributes(edge));
                }
            })
            .build();

        Ok(Self {
            meter,
            _provider: provider,
            _requests: requests,
            latest_snapshot,
        })
    }

    /// Record a snapshot as the one the next export will report.
    pub fn record(&self, snapshot: &MetricsSnapshot) {
        *self.latest_snapshot.write() = Some(snapshot.clone());
    }

    /// Get a reference to the meter for custom metrics.
    pub fn meter(&self) -> &Meter {
        &self.meter
    }
}

fn edge_attributes(edge: &netlog_types::Edge) -> Vec<KeyValue> {
    edge.attributes()
        .into_iter()
        .chain(edge.resource_attributes())
        .map(|(key, value)| KeyValue::new(key, value.to_string()))
        .collect()
}

impl std::fmt::Debug for OtelExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelExporter")
            .field("meter", &"Meter { ... }")
            .finish()
    }
}

/// Emits synthetic traces for the observed topology over OTLP/HTTP.
///
/// Every export walks the [`ServiceGraph`] of a snapshot from its roots and
/// records one SERVER span per node, marked `synthetic = true`. Spans nest
/// along calls, so a trace backend draws the same service map the sniffer
/// saw. Each service gets its own tracer provider, created on first use and
/// kept for the life of the exporter.
pub struct TraceExporter {
    endpoint: String,
    providers: Mutex<HashMap<String, SdkTracerProvider>>,
}

impl TraceExporter {
    /// Create an exporter sending to `config.endpoint`.
    pub fn new(config: &OtelConfig) -> Self {
        Self {
            endpoint: format!("{}/v1/traces", config.endpoint),
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Emit one trace per root of the snapshot's service graph.
    ///
    /// Returns the number of spans recorded. Blocks while exporters are
    /// created, so call it off the async runtime.
    pub fn export(&self, snapshot: &MetricsSnapshot) -> Result<usize, BoxError> {
        let graph = ServiceGraph::from_snapshot(snapshot);
        let mut spans = 0;
        for tree in graph.span_trees() {
            spans += self.emit_span(&tree, &Context::new())?;
        }
        Ok(spans)
    }

    fn emit_span(&self, node: &SpanNode, parent: &Context) -> Result<usize, BoxError> {
        let tracer = self.provider_for(&node.service)?.tracer(SCOPE_NAME);

        let mut span = tracer
            .span_builder(node.service.clone())
            .with_kind(SpanKind::Server)
            .with_attributes(span_attributes(node))
            .start_with_context(&tracer, parent);
        span.add_event(format!("Processing node: {}", node.service), Vec::new());

        let cx = parent.with_span(span);
        let mut spans = 1;
        for child in &node.children {
            spans += self.emit_span(child, &cx)?;
        }
        cx.span().end();

        Ok(spans)
    }

    fn provider_for(&self, service: &str) -> Result<SdkTracerProvider, BoxError> {
        use opentelemetry_otlp::SpanExporter;
        use opentelemetry_sdk::Resource;

        let mut providers = self.providers.lock();
        if let Some(provider) = providers.get(service) {
            return Ok(provider.clone());
        }

        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(self.endpoint.clone())
            .build()?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(
                Resource::builder()
                    .with_service_name(service.to_string())
                    .build(),
            )
            .build();

        providers.insert(service.to_string(), provider.clone());
        Ok(provider)
    }

    /// Push buffered spans for every service now.
    pub fn flush(&self) {
        for (service, provider) in self.providers.lock().iter() {
            if let Err(e) = provider.force_flush() {
                warn!(service = %service, error = %e, "failed to flush synthetic spans");
            }
        }
    }

    /// Number of services a tracer provider has been created for.
    pub fn service_count(&self) -> usize {
        self.providers.lock().len()
    }
}

fn span_attributes(node: &SpanNode) -> Vec<KeyValue> {
    vec![
        KeyValue::new("synthetic", true),
        KeyValue::new("node", node.service.clone()),
        KeyValue::new("net.peer.ip", node.address.clone()),
    ]
}

impl std::fmt::Debug for TraceExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceExporter")
            .field("endpoint", &self.endpoint)
            .field("services", &self.service_count())
            .finish()
    }
}
