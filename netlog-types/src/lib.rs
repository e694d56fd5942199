//! # netlog-types
//!
//! Core types for network topology observation. This crate defines the data
//! that flows through a netlog receiver: the batches a sniffer reports, the
//! identity of an observed source, and the service-graph snapshot produced on
//! every scrape.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to read and write JSON
//! - **Faithful keys**: Sources are keyed by their combined `ip:hostname` token
//! - **Versioned schema**: Snapshots include version info for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use netlog_types::{CaptureResults, ResultRecord, SourceIdentity};
//!
//! let batch = CaptureResults::new(vec![
//!     ResultRecord::new("10.0.0.1:checkout", ["10.0.0.7", "10.0.0.9"]),
//! ]);
//! assert_eq!(batch.destination_count(), 2);
//!
//! let identity = SourceIdentity::parse("10.0.0.1:checkout");
//! assert_eq!(identity.ip, "10.0.0.1");
//! assert_eq!(identity.hostname, "checkout");
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! snapshots to allow consumers to handle format evolution gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod identity;
mod report;
mod snapshot;
mod version;

pub use identity::*;
pub use report::*;
pub use snapshot::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;
