//! The sniffer seam and two stream-backed feeds.
//!
//! The packet/socket sniffer itself lives outside this crate. Anything that
//! can drive the two [`Reporter`] calls until cancelled implements
//! [`Sniffer`]. [`LineSniffer`] and [`ChannelSniffer`] cover the common cases
//! of receiving report batches over a byte stream or an in-process channel.

use std::sync::Arc;

use async_trait::async_trait;
use netlog_types::{CaptureResults, SocketScanResults};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::ingestor::Reporter;

/// A continuously running source of report batches.
///
/// `run_forever` is expected to run until `cancel` fires. Returning `Ok`
/// means the feed ended cleanly; returning `Err` is treated as fatal by the
/// host.
#[async_trait]
pub trait Sniffer: Send + 'static {
    /// Feed observations to `reporter` until cancelled or exhausted.
    async fn run_forever(
        &mut self,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Result<(), FeedError>;

    /// Human-readable description, used in logs.
    fn description(&self) -> &str;
}

/// One report batch as carried on a feed.
///
/// Serialized as an internally tagged object, one per line:
///
/// ```json
/// {"kind":"capture","results":[{"source_token":"10.0.0.1:podA","destinations":[{"destination":"10.0.0.2"}]}]}
/// {"kind":"socket_scan","results":[]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedMessage {
    /// A packet capture batch.
    Capture(CaptureResults),
    /// A socket scan batch.
    SocketScan(SocketScanResults),
}

impl FeedMessage {
    /// Hand this batch to the matching report operation.
    pub fn deliver(&self, reporter: &dyn Reporter) {
        match self {
            FeedMessage::Capture(results) => reporter.report_capture_results(results),
            FeedMessage::SocketScan(results) => reporter.report_socket_scan_results(results),
        }
    }
}

/// A sniffer that reads newline-delimited JSON [`FeedMessage`]s from an
/// async reader (TCP socket, stdin, file).
///
/// Lines are read as raw bytes, so a line that is not valid UTF-8 or not a
/// valid message is logged and skipped like any other malformed line. End of
/// stream ends the feed cleanly; a read error ends it with [`FeedError::Io`].
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use netlog_receiver::LineSniffer;
///
/// let data = br#"{"kind":"capture","results":[]}"#.to_vec();
/// let sniffer = LineSniffer::new(Cursor::new(data), "example");
/// ```
#[derive(Debug)]
pub struct LineSniffer<R> {
    reader: BufReader<R>,
    description: String,
}

impl<R> LineSniffer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Wrap a reader.
    pub fn new(reader: R, description: &str) -> Self {
        Self {
            reader: BufReader::new(reader),
            description: format!("stream: {}", description),
        }
    }
}

#[async_trait]
impl<R> Sniffer for LineSniffer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn run_forever(
        &mut self,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Result<(), FeedError> {
        let mut line = Vec::new();
        let mut line_no = 0u64;

        loop {
            line.clear();
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(feed = %self.description, "feed cancelled");
                    return Ok(());
                }
                read = self.reader.read_until(b'\n', &mut line) => read?,
            };

            if read == 0 {
                info!(feed = %self.description, lines = line_no, "feed reached end of stream");
                return Ok(());
            }
            line_no += 1;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<FeedMessage>(&line) {
                Ok(message) => message.deliver(reporter.as_ref()),
                Err(e) => warn!(
                    feed = %self.description,
                    line = line_no,
                    error = %e,
                    "skipping unparseable feed line"
                ),
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A sniffer fed through an in-process channel.
///
/// Useful when the real sniffer runs in the same process and already
/// produces typed batches. The feed ends when every sender is dropped.
///
/// # Example
///
/// ```rust
/// use netlog_receiver::ChannelSniffer;
///
/// let (tx, sniffer) = ChannelSniffer::create(16, "in-process");
/// ```
#[derive(Debug)]
pub struct ChannelSniffer {
    receiver: mpsc::Receiver<FeedMessage>,
    description: String,
}

impl ChannelSniffer {
    /// Wrap an existing receiver.
    pub fn new(receiver: mpsc::Receiver<FeedMessage>, description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", description),
        }
    }

    /// Create a channel pair. Returns (sender, sniffer).
    pub fn create(buffer: usize, description: &str) -> (mpsc::Sender<FeedMessage>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx, description))
    }
}

#[async_trait]
impl Sniffer for ChannelSniffer {
    async fn run_forever(
        &mut self,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Result<(), FeedError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(feed = %self.description, "feed cancelled");
                    return Ok(());
                }
                message = self.receiver.recv() => match message {
                    Some(message) => message.deliver(reporter.as_ref()),
                    None => {
                        info!(feed = %self.description, "all feed senders dropped");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
