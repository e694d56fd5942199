//! # netlog-collector
//!
//! Host process for the netlog receiver: loads settings, connects the
//! sniffer feed, starts the receiver and decides what a dead feed means.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  NDJSON   ┌──────────┐   ┌───────┐   ┌─────────┐   ┌──────────┐
//! │ sniffer     │──────────▶│ Ingestor │──▶│ Store │◀──│ Scraper │──▶│ outputs  │
//! │ (tcp/stdin) │           └──────────┘   └───────┘   └─────────┘   └──────────┘
//! └─────────────┘                                          ▲ every collection_interval
//! ```
//!
//! - **[`settings`]**: file + `NETLOG_*` environment configuration
//! - **[`collector`]**: builds the receiver and runs it until shutdown
//! - **[`duration`]**: duration strings such as `"10s"` or `"500ms"`
//!
//! ## Usage
//!
//! ```bash
//! # Read batches from a sniffer on port 7070, write the topology every 10s
//! netlog-collector --connect 127.0.0.1:7070 --output-file topology.json
//!
//! # Replay a captured feed and print the resulting snapshot
//! netlog-collector --once < feed.ndjson
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use netlog_collector::{collector, Settings};
//!
//! # tokio_test::block_on(async {
//! let mut settings = Settings::default();
//! settings.feed.connect = Some("127.0.0.1:7070".to_string());
//!
//! let snapshot = collector::run_once(&settings).await.unwrap();
//! println!("{} edges", snapshot.len());
//! # });
//! ```

pub mod collector;
pub mod duration;
pub mod settings;

pub use settings::{FeedSettings, OutputSettings, Settings};
