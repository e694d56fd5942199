use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use netlog_collector::{collector, Settings};

#[derive(Parser, Debug)]
#[command(name = "netlog-collector")]
#[command(about = "Turn network sniffer reports into service-graph metrics")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time between scrapes (e.g., "10s", "500ms")
    #[arg(short, long)]
    interval: Option<String>,

    /// Read report batches from a TCP endpoint (host:port) instead of stdin
    #[arg(long)]
    connect: Option<String>,

    /// Write each snapshot to this JSON file
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Send each snapshot as a JSON line to a TCP endpoint (host:port)
    #[arg(long)]
    output_tcp: Option<String>,

    /// Export snapshots over OTLP/HTTP (requires the `otel` feature)
    #[arg(long)]
    otel_endpoint: Option<String>,

    /// Emit synthetic traces of the topology over OTLP/HTTP (requires the `otel` feature)
    #[arg(long)]
    trace_endpoint: Option<String>,

    /// Serve Prometheus metrics on this address (requires the `prometheus` feature)
    #[arg(long)]
    prometheus_listen: Option<String>,

    /// Log filter when RUST_LOG is not set (e.g., "info", "netlog_receiver=debug")
    #[arg(long)]
    log_level: Option<String>,

    /// Read the feed to its end, print one snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    /// Command-line flags win over file and environment settings.
    fn apply(self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.collection_interval = interval;
        }
        if let Some(connect) = self.connect {
            settings.feed.connect = Some(connect);
        }
        if let Some(path) = self.output_file {
            settings.output.file = Some(path);
        }
        if let Some(addr) = self.output_tcp {
            settings.output.tcp = Some(addr);
        }
        if let Some(endpoint) = self.otel_endpoint {
            settings.output.otel_endpoint = Some(endpoint);
        }
        if let Some(endpoint) = self.trace_endpoint {
            settings.output.trace_endpoint = Some(endpoint);
        }
        if let Some(listen) = self.prometheus_listen {
            settings.output.prometheus_listen = Some(listen);
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let once = args.once;

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    init_tracing(&settings.log_level);

    let rt = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;

    if once {
        let snapshot = rt.block_on(collector::run_once(&settings))?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    rt.block_on(collector::run(&settings))
}

/// Logs go to stderr so `--once` output on stdout stays clean.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
