//! MetricsSnapshot - a point-in-time view of the observed topology.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{SchemaVersion, SourceIdentity};

/// Name of the counter emitted for every edge.
///
/// Matches the series name service-graph dashboards query for.
pub const METRIC_NAME: &str = "traces_service_graph_request_total";

/// Instrumentation scope the counter is reported under.
pub const SCOPE_NAME: &str = "traces_service_graph";

/// Attribute keys used on exported edges.
pub mod attributes {
    /// Resource attribute carrying the source ip.
    pub const CLIENT_SOCKET_ADDRESS: &str = "client.socket.address";
    /// Resource attribute carrying the source hostname.
    pub const CLIENT_ADDRESS: &str = "client.address";
    /// Resource attribute carrying the destination.
    pub const SERVER_SOCKET_ADDRESS: &str = "server.socket.address";
    /// Data-point dimension carrying the source ip.
    pub const CLIENT: &str = "client";
    /// Data-point dimension carrying the destination.
    pub const SERVER: &str = "server";
}

/// How a counter's values relate across reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AggregationTemporality {
    /// Each value is the running total since the start timestamp.
    Cumulative,
    /// Each value covers only the interval since the previous report.
    Delta,
}

/// One observed source→destination pairing, rendered as a counter data point.
///
/// Each edge is a monotonic, cumulative counter with value 1. The source ip,
/// hostname and destination appear twice: once as resource attributes and
/// once (ip and destination) as data-point dimensions. Consumers rely on both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// Source ip, re-split from the source token.
    pub source_ip: String,

    /// Source hostname, re-split from the source token.
    pub source_hostname: String,

    /// Destination address.
    pub destination_ip: String,

    /// Counter start time, nanoseconds since Unix epoch.
    pub start_time_unix_nano: u64,

    /// Counter observation time, nanoseconds since Unix epoch.
    pub time_unix_nano: u64,

    /// Counter value. Always 1.
    pub value: u64,
}

impl Edge {
    /// Create an edge whose start and end timestamps are both `now_unix_nano`.
    pub fn new(source: SourceIdentity, destination: impl Into<String>, now_unix_nano: u64) -> Self {
        Self {
            source_ip: source.ip,
            source_hostname: source.hostname,
            destination_ip: destination.into(),
            start_time_unix_nano: now_unix_nano,
            time_unix_nano: now_unix_nano,
            value: 1,
        }
    }

    /// Create an edge stamped with the current wall-clock time.
    #[cfg(feature = "std")]
    pub fn now(source: SourceIdentity, destination: impl Into<String>) -> Self {
        Self::new(source, destination, current_timestamp_nanos())
    }

    /// Counters are monotonic.
    pub const fn is_monotonic(&self) -> bool {
        true
    }

    /// Counters are cumulative.
    pub const fn temporality(&self) -> AggregationTemporality {
        AggregationTemporality::Cumulative
    }

    /// Resource-level attributes for this edge.
    pub fn resource_attributes(&self) -> [(&'static str, &str); 3] {
        [
            (attributes::CLIENT_SOCKET_ADDRESS, self.source_ip.as_str()),
            (attributes::CLIENT_ADDRESS, self.source_hostname.as_str()),
            (attributes::SERVER_SOCKET_ADDRESS, self.destination_ip.as_str()),
        ]
    }

    /// Data-point dimensions for this edge.
    pub fn attributes(&self) -> [(&'static str, &str); 2] {
        [
            (attributes::CLIENT, self.source_ip.as_str()),
            (attributes::SERVER, self.destination_ip.as_str()),
        ]
    }
}

/// A point-in-time snapshot of every edge the receiver has observed.
///
/// Snapshots are produced fresh on every scrape from the live store; they are
/// never deltas. Edge order carries no meaning.
///
/// # Example
///
/// ```rust
/// use netlog_types::MetricsSnapshot;
///
/// let snapshot = MetricsSnapshot::builder()
///     .edge("10.0.0.1:checkout", "10.0.0.7")
///     .edge("10.0.0.1:checkout", "10.0.0.9")
///     .build();
///
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.edges_from("10.0.0.1").count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// One entry per source→destination pairing.
    pub edges: Vec<Edge>,
}

impl MetricsSnapshot {
    /// Create an empty snapshot with the current timestamp.
    #[cfg(feature = "std")]
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            version: SchemaVersion::current(),
            timestamp_ms,
            edges: Vec::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of edges in the snapshot.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all edges.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Edges whose source ip matches.
    pub fn edges_from<'a>(&'a self, source_ip: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source_ip == source_ip)
    }

    /// Sum of all counter values.
    pub fn total_value(&self) -> u64 {
        self.edges.iter().map(|e| e.value).sum()
    }
}

#[cfg(feature = "std")]
impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a MetricsSnapshot {
    type Item = &'a Edge;
    type IntoIter = core::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// Builder for constructing `MetricsSnapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    edges: Vec<Edge>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            timestamp_ms: None,
            edges: Vec::new(),
        }
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add an edge from a source token, stamped at the snapshot timestamp.
    pub fn edge(self, source_token: &str, destination: impl Into<String>) -> Self {
        let nanos = self.timestamp_ms.unwrap_or(0).saturating_mul(1_000_000);
        self.push(Edge::new(SourceIdentity::parse(source_token), destination, nanos))
    }

    /// Add a pre-built edge.
    pub fn push(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Build the snapshot.
    #[cfg(feature = "std")]
    pub fn build(self) -> MetricsSnapshot {
        MetricsSnapshot {
            version: SchemaVersion::current(),
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            edges: self.edges,
        }
    }

    /// Build the snapshot with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> MetricsSnapshot {
        MetricsSnapshot {
            version: SchemaVersion::current(),
            timestamp_ms: self.timestamp_ms.unwrap_or(0),
            edges: self.edges,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Get current timestamp in nanoseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_nanos() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
