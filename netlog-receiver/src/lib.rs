//! # netlog-receiver
//!
//! Turns connection reports from a network sniffer into a service-graph
//! topology and scrapes it on a fixed interval.
//!
//! The sniffer calls two report operations with batches of
//! `ip:hostname → destination` observations. Each distinct pairing is kept
//! forever in an [`AggregationStore`]; every scrape renders the whole store
//! as `traces_service_graph_request_total` edges with value 1.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netlog_receiver::{LineSniffer, Output, Receiver};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Scrape every ten seconds into a JSON file
//!     let receiver = Receiver::builder()
//!         .output(Output::file("topology.json"))
//!         .interval(Duration::from_secs(10))
//!         .build();
//!
//!     // Read newline-delimited report batches from stdin
//!     let sniffer = LineSniffer::new(tokio::io::stdin(), "stdin");
//!
//!     // Start the feed and the scheduler (non-blocking)
//!     let mut running = receiver.start(sniffer).unwrap();
//!
//!     // A feed error is handed back here instead of aborting the process
//!     if let Err(e) = running.feed_finished().await {
//!         eprintln!("feed died: {e}");
//!     }
//!     running.stop().await.ok();
//! }
//! ```
//!
//! ## Features
//!
//! - **Two report operations**: packet capture and socket scan batches
//! - **Deduplicated topology**: one entry per source/destination pair
//! - **Multiple outputs**: File, TCP, channel, OTLP, or Prometheus
//! - **Synthetic traces**: the topology replayed as nested SERVER spans
//! - **Supervised feed**: cancellable, joined on stop, errors reported to the host
//! - **Thread-safe**: report from any thread or async task

mod config;
mod error;
mod ingestor;
mod output;
mod receiver;
mod scraper;
mod service_graph;
mod sniffer;
mod store;

#[cfg(feature = "otel")]
pub mod otel;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use config::{ReceiverConfig, ReceiverConfigBuilder, DEFAULT_COLLECTION_INTERVAL};
pub use error::{FeedError, ReceiverError};
pub use ingestor::{Ingestor, Reporter};
pub use output::Output;
pub use receiver::{Receiver, ReceiverBuilder, RunningReceiver};
pub use scraper::Scraper;
pub use service_graph::{ServiceGraph, SpanNode};
pub use sniffer::{ChannelSniffer, FeedMessage, LineSniffer, Sniffer};
pub use store::AggregationStore;

#[cfg(feature = "otel")]
pub use otel::{OtelConfig, OtelExporter, TraceExporter};

#[cfg(feature = "prometheus")]
pub use prometheus::{PrometheusConfig, PrometheusExporter};

// Re-export types for convenience
pub use netlog_types::{
    CaptureResults, Destination, Edge, MetricsSnapshot, ResultRecord, SocketScanResults,
    SourceIdentity,
};
