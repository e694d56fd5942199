//! Snapshot exporter: renders the whole store as service-graph edges.

use std::sync::Arc;

use netlog_types::{current_timestamp_nanos, Edge, MetricsSnapshot, SourceIdentity};

use crate::store::AggregationStore;

/// Produces one [`MetricsSnapshot`] per call from the current store content.
///
/// A scrape is a live read, not a drain: two scrapes with no reports in
/// between return the same edges. Scraping cannot fail.
#[derive(Debug, Clone)]
pub struct Scraper {
    store: Arc<AggregationStore>,
}

impl Scraper {
    /// Create a scraper reading from `store`.
    pub fn new(store: Arc<AggregationStore>) -> Self {
        Self { store }
    }

    /// Render every source→destination pairing as an edge.
    ///
    /// The store stays locked while edges are built so the result is one
    /// consistent point in time. Each edge is stamped with the wall clock at
    /// the moment it is emitted, not the time it was first observed.
    pub fn scrape(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::new();

        self.store.for_each_edge(|token, destination| {
            snapshot.edges.push(Edge::new(
                SourceIdentity::parse(token),
                destination,
                current_timestamp_nanos(),
            ));
        });

        snapshot
    }
}
