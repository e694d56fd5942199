use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netlog_receiver::{CaptureResults, Receiver, Reporter, ResultRecord, SocketScanResults};

/// Benchmark a capture report for an already-known edge (hot path)
fn bench_report_known_edge(c: &mut Criterion) {
    let receiver = Receiver::new();
    let batch = CaptureResults::new(vec![ResultRecord::new("10.0.0.1:podA", ["10.0.0.2"])]);
    receiver.ingestor().report_capture_results(&batch);

    c.bench_function("report_known_edge", |b| {
        b.iter(|| {
            receiver.ingestor().report_capture_results(black_box(&batch));
        });
    });
}

/// Benchmark a socket scan report for an already-known edge
fn bench_socket_scan_known_edge(c: &mut Criterion) {
    let receiver = Receiver::new();
    let batch = SocketScanResults::new(vec![ResultRecord::new("10.0.0.1:podA", ["10.0.0.2"])]);
    receiver.ingestor().report_socket_scan_results(&batch);

    c.bench_function("socket_scan_known_edge", |b| {
        b.iter(|| {
            receiver.ingestor().report_socket_scan_results(black_box(&batch));
        });
    });
}

/// Benchmark inserting edges the store has never seen
fn bench_report_new_edges(c: &mut Criterion) {
    let receiver = Receiver::new();
    let mut n = 0u64;

    c.bench_function("report_new_edge", |b| {
        b.iter(|| {
            n += 1;
            let batch = CaptureResults::new(vec![ResultRecord::new(
                "10.0.0.1:podA",
                [format!("10.1.{}.{}", n / 256, n % 256)],
            )]);
            receiver.ingestor().report_capture_results(black_box(&batch));
        });
    });
}

/// Benchmark batches with varying destination counts
fn bench_report_varying_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_varying_batch_sizes");

    for size in [1usize, 10, 100, 1000].iter() {
        let receiver = Receiver::new();
        let destinations: Vec<String> = (0..*size).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
        let batch = CaptureResults::new(vec![ResultRecord::new("10.0.0.1:podA", destinations)]);

        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                receiver.ingestor().report_capture_results(black_box(batch));
            });
        });
    }
    group.finish();
}

/// Benchmark batches spread over many sources
fn bench_report_many_sources(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_many_sources");

    for source_count in [1usize, 5, 10, 20].iter() {
        let receiver = Receiver::new();
        let records: Vec<ResultRecord> = (0..*source_count)
            .map(|i| ResultRecord::from_parts(&format!("10.0.0.{}", i), &format!("pod-{}", i), ["10.9.9.9"]))
            .collect();
        let batch = CaptureResults::new(records);

        group.bench_with_input(BenchmarkId::from_parameter(source_count), &batch, |b, batch| {
            b.iter(|| {
                receiver.ingestor().report_capture_results(black_box(batch));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_report_known_edge,
    bench_socket_scan_known_edge,
    bench_report_new_edges,
    bench_report_varying_batch_sizes,
    bench_report_many_sources
);
criterion_main!(benches);
