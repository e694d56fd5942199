//! Observation ingestor: the report calls a sniffer makes.

use std::sync::Arc;

use netlog_types::{CaptureResults, ResultRecord, SocketScanResults};
use tracing::{trace, Level};

use crate::store::AggregationStore;

/// The two report operations a sniffer drives.
///
/// Implementations must accept any input shape without failing; malformed
/// source tokens are recorded as-is and degrade to an empty identity when
/// exported.
pub trait Reporter: Send + Sync {
    /// Report connections seen by packet capture.
    fn report_capture_results(&self, results: &CaptureResults);

    /// Report connections seen by a socket table scan.
    fn report_socket_scan_results(&self, results: &SocketScanResults);
}

/// Merges reported observations into an [`AggregationStore`].
///
/// Cheap to clone; every clone writes to the same store. Safe to call from
/// any thread or task, concurrently with scrapes.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use netlog_receiver::{AggregationStore, Ingestor, Reporter};
/// use netlog_types::{CaptureResults, ResultRecord};
///
/// let store = Arc::new(AggregationStore::new());
/// let ingestor = Ingestor::new(store.clone());
///
/// ingestor.report_capture_results(&CaptureResults::new(vec![
///     ResultRecord::new("10.0.0.1:podA", ["10.0.0.2", "10.0.0.3", "10.0.0.2"]),
/// ]));
///
/// assert_eq!(store.edge_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Arc<AggregationStore>,
}

impl Ingestor {
    /// Create an ingestor writing to `store`.
    pub fn new(store: Arc<AggregationStore>) -> Self {
        Self { store }
    }

    /// The store this ingestor writes to.
    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.store
    }

    fn ingest(&self, kind: &'static str, records: &[ResultRecord]) {
        let mut added = 0usize;
        for record in records {
            for dest in &record.destinations {
                if !self.store.upsert(&record.source_token, &dest.destination) {
                    continue;
                }
                added += 1;
                if tracing::enabled!(Level::TRACE) {
                    let source = record.source();
                    trace!(
                        source_ip = %source.ip,
                        source_hostname = %source.hostname,
                        destination = %dest.destination,
                        "new edge"
                    );
                }
            }
        }
        trace!(kind, records = records.len(), added, "ingested report batch");
    }
}

impl Reporter for Ingestor {
    fn report_capture_results(&self, results: &CaptureResults) {
        self.ingest("capture", &results.results);
    }

    fn report_socket_scan_results(&self, results: &SocketScanResults) {
        self.ingest("socket_scan", &results.results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_ingestor() -> Ingestor {
        Ingestor::new(Arc::new(AggregationStore::new()))
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_capture_results_collapse_duplicates() {
        let ingestor = create_ingestor();
        ingestor.report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
            "10.0.0.1:podA",
            ["d1", "d2", "d1"],
        )]));

        assert_eq!(
            ingestor.store().destinations("10.0.0.1:podA"),
            Some(set(&["d1", "d2"]))
        );
    }

    #[test]
    fn test_socket_scan_results_collapse_duplicates() {
        let ingestor = create_ingestor();
        ingestor.report_socket_scan_results(&SocketScanResults::new(vec![ResultRecord::new(
            "10.0.0.1:podA",
            ["d1", "d2", "d1"],
        )]));

        assert_eq!(
            ingestor.store().destinations("10.0.0.1:podA"),
            Some(set(&["d1", "d2"]))
        );
    }

    #[test]
    fn same_destination_through_both_operations_is_one_entry() {
        let ingestor = create_ingestor();
        let record = ResultRecord::new("10.0.0.1:podA", ["10.0.0.9"]);

        ingestor.report_capture_results(&CaptureResults::new(vec![record.clone()]));
        ingestor.report_socket_scan_results(&SocketScanResults::new(vec![record]));

        assert_eq!(ingestor.store().edge_count(), 1);
    }

    #[test]
    fn malformed_token_is_still_recorded() {
        let ingestor = create_ingestor();
        ingestor.report_capture_results(&CaptureResults::new(vec![
            ResultRecord::new("", ["d1"]),
            ResultRecord::new("a:b:c", ["d2"]),
        ]));

        assert_eq!(ingestor.store().destinations(""), Some(set(&["d1"])));
        assert_eq!(ingestor.store().destinations("a:b:c"), Some(set(&["d2"])));
    }

    #[test]
    fn trace_logging_does_not_change_what_is_recorded() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .finish();

        let ingestor = create_ingestor();
        tracing::subscriber::with_default(subscriber, || {
            ingestor.report_capture_results(&CaptureResults::new(vec![
                ResultRecord::new("10.0.0.1:podA", ["d1", "d1"]),
                ResultRecord::new("a:b:c", ["d2"]),
            ]));
        });

        assert_eq!(ingestor.store().edge_count(), 2);
        assert_eq!(ingestor.store().destinations("a:b:c"), Some(set(&["d2"])));
    }

    #[test]
    fn record_without_destinations_adds_nothing() {
        let ingestor = create_ingestor();
        ingestor.report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
            "10.0.0.1:podA",
            Vec::<String>::new(),
        )]));

        assert!(ingestor.store().is_empty());
    }

    #[test]
    fn empty_batch_is_accepted() {
        let ingestor = create_ingestor();
        ingestor.report_capture_results(&CaptureResults::default());
        ingestor.report_socket_scan_results(&SocketScanResults::default());

        assert!(ingestor.store().is_empty());
    }

    #[test]
    fn clones_share_the_store() {
        let ingestor = create_ingestor();
        let clone = ingestor.clone();

        clone.report_capture_results(&CaptureResults::new(vec![ResultRecord::new(
            "a:b",
            ["d1"],
        )]));

        assert_eq!(ingestor.store().edge_count(), 1);
    }
}
