//! Error types for the receiver lifecycle and sniffer feeds.

use thiserror::Error;

/// Errors that end a sniffer feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Reading from the feed's underlying stream failed.
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sniffer could not be started or stopped unexpectedly.
    #[error("sniffer failed: {0}")]
    Sniffer(String),
}

/// Errors surfaced by a running receiver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// `start()` was called on a receiver that is already running.
    #[error("receiver already started")]
    AlreadyStarted,

    /// The sniffer feed terminated with an error.
    #[error("sniffer feed terminated: {0}")]
    Feed(#[from] FeedError),

    /// The sniffer feed task panicked.
    #[error("sniffer feed panicked: {0}")]
    FeedPanicked(String),

    /// A background task was cancelled by the runtime before it finished.
    #[error("background task cancelled: {0}")]
    TaskCancelled(String),
}

impl ReceiverError {
    /// True when the error came from the sniffer feed itself.
    pub fn is_feed_failure(&self) -> bool {
        matches!(self, ReceiverError::Feed(_) | ReceiverError::FeedPanicked(_))
    }
}

impl From<tokio::task::JoinError> for ReceiverError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            ReceiverError::FeedPanicked(err.to_string())
        } else {
            ReceiverError::TaskCancelled(err.to_string())
        }
    }
}
