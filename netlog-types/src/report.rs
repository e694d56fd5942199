//! Report batches delivered by a sniffer.
//!
//! A sniffer observes connections in two ways (packet capture and socket
//! table scans) and reports each as its own batch type. Both carry the same
//! record shape: a source token plus the destinations seen from it.

use alloc::string::String;
use alloc::vec::Vec;

use crate::identity::{join_token, SourceIdentity};

/// A single destination observed from a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destination {
    /// Destination address.
    pub destination: String,
}

impl Destination {
    /// Create a destination record.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl From<&str> for Destination {
    fn from(destination: &str) -> Self {
        Self::new(destination)
    }
}

impl From<String> for Destination {
    fn from(destination: String) -> Self {
        Self { destination }
    }
}

/// One source and everything it was seen talking to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultRecord {
    /// Combined `ip:hostname` token identifying the source.
    pub source_token: String,

    /// Destinations observed from this source.
    #[cfg_attr(feature = "serde", serde(default))]
    pub destinations: Vec<Destination>,
}

impl ResultRecord {
    /// Create a record from a source token and destination addresses.
    pub fn new<I, D>(source_token: impl Into<String>, destinations: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Destination>,
    {
        Self {
            source_token: source_token.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a record from a separate ip and hostname.
    ///
    /// The token is built by concatenation, the same way the sniffer keys
    /// its sources.
    pub fn from_parts<I, D>(ip: &str, hostname: &str, destinations: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Destination>,
    {
        Self::new(join_token(ip, hostname), destinations)
    }

    /// Parse the source token into an identity.
    pub fn source(&self) -> SourceIdentity {
        SourceIdentity::parse(&self.source_token)
    }
}

/// Results from packet capture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureResults {
    /// Observed records.
    #[cfg_attr(feature = "serde", serde(default))]
    pub results: Vec<ResultRecord>,
}

impl CaptureResults {
    /// Create a capture batch.
    pub fn new(results: Vec<ResultRecord>) -> Self {
        Self { results }
    }

    /// Total destinations across all records (duplicates included).
    pub fn destination_count(&self) -> usize {
        destination_count(&self.results)
    }
}

/// Results from a socket table scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketScanResults {
    /// Observed records.
    #[cfg_attr(feature = "serde", serde(default))]
    pub results: Vec<ResultRecord>,
}

impl SocketScanResults {
    /// Create a socket scan batch.
    pub fn new(results: Vec<ResultRecord>) -> Self {
        Self { results }
    }

    /// Total destinations across all records (duplicates included).
    pub fn destination_count(&self) -> usize {
        destination_count(&self.results)
    }
}

fn destination_count(records: &[ResultRecord]) -> usize {
    records.iter().map(|r| r.destinations.len()).sum()
}
