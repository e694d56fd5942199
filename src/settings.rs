//! Collector settings, layered from an optional file and `NETLOG_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment:
//!
//! ```bash
//! NETLOG_COLLECTION_INTERVAL=30s
//! NETLOG_FEED__CONNECT=127.0.0.1:7070
//! NETLOG_OUTPUT__FILE=/var/lib/netlog/topology.json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::duration::parse_duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "NETLOG";

/// Everything the collector binary needs to run. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Time between scrapes, e.g. "10s"
    pub collection_interval: String,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Where report batches are read from
    pub feed: FeedSettings,
    /// Where snapshots are delivered
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_interval: "10s".to_string(),
            log_level: "info".to_string(),
            feed: FeedSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Where report batches come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// `host:port` of a sniffer streaming NDJSON batches; stdin when unset
    pub connect: Option<String>,
}

/// Where snapshots go. Every configured output receives every scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// JSON file rewritten on every scrape
    pub file: Option<PathBuf>,
    /// `host:port` receiving one JSON line per scrape
    pub tcp: Option<String>,
    /// OTLP/HTTP base endpoint for the service-graph counter (`otel` feature)
    pub otel_endpoint: Option<String>,
    /// OTLP/HTTP base endpoint for synthetic traces built from the topology
    /// (`otel` feature)
    pub trace_endpoint: Option<String>,
    /// Address for the Prometheus scrape endpoint (`prometheus` feature)
    pub prometheus_listen: Option<String>,
}

impl Settings {
    /// Load settings from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("failed to load configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// The parsed collection interval.
    pub fn collection_interval(&self) -> Result<Duration> {
        parse_duration(&self.collection_interval)
            .with_context(|| format!("invalid collection_interval {:?}", self.collection_interval))
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
