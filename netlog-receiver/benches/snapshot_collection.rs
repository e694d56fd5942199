use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netlog_receiver::{CaptureResults, Receiver, Reporter, ResultRecord};

fn populated(sources: usize, destinations: usize) -> Receiver {
    let receiver = Receiver::new();
    for i in 0..sources {
        let dests: Vec<String> = (0..destinations).map(|j| format!("10.1.{}.{}", j / 256, j % 256)).collect();
        receiver
            .ingestor()
            .report_capture_results(&CaptureResults::new(vec![ResultRecord::from_parts(
                &format!("10.0.{}.{}", i / 256, i % 256),
                &format!("pod-{}", i),
                dests,
            )]));
    }
    receiver
}

/// Benchmark scrape() with a single source and varying destination counts
fn bench_scrape_single_source_varying_destinations(c: &mut Criterion) {
    let mut group = c.benchmark_group("scrape_single_source");

    for dest_count in [1, 5, 10, 50, 100].iter() {
        let receiver = populated(1, *dest_count);

        group.bench_with_input(BenchmarkId::from_parameter(dest_count), dest_count, |b, _| {
            b.iter(|| {
                black_box(receiver.scrape());
            });
        });
    }
    group.finish();
}

/// Benchmark scrape() with varying source counts
fn bench_scrape_varying_sources(c: &mut Criterion) {
    let mut group = c.benchmark_group("scrape_varying_sources");

    for source_count in [1, 5, 10, 20, 50].iter() {
        let receiver = populated(*source_count, 5);

        group.bench_with_input(BenchmarkId::from_parameter(source_count), source_count, |b, _| {
            b.iter(|| {
                black_box(receiver.scrape());
            });
        });
    }
    group.finish();
}

/// Benchmark scrape() on a cluster-sized topology
fn bench_scrape_realistic_topology(c: &mut Criterion) {
    // 200 pods, each talking to 20 peers
    let receiver = populated(200, 20);

    c.bench_function("scrape_realistic_topology", |b| {
        b.iter(|| {
            black_box(receiver.scrape());
        });
    });
}

/// Benchmark scrape() interleaved with reports
fn bench_scrape_with_active_reporting(c: &mut Criterion) {
    let receiver = populated(10, 10);
    let batch = CaptureResults::new(vec![ResultRecord::new("10.0.0.0:pod-0", ["10.1.0.0"])]);

    c.bench_function("scrape_with_active_reporting", |b| {
        b.iter(|| {
            receiver.ingestor().report_capture_results(&batch);
            black_box(receiver.scrape());
        });
    });
}

/// Benchmark empty scrape() to measure baseline overhead
fn bench_scrape_empty(c: &mut Criterion) {
    let receiver = Receiver::new();

    c.bench_function("scrape_empty", |b| {
        b.iter(|| {
            black_box(receiver.scrape());
        });
    });
}

criterion_group!(
    benches,
    bench_scrape_single_source_varying_destinations,
    bench_scrape_varying_sources,
    bench_scrape_realistic_topology,
    bench_scrape_with_active_reporting,
    bench_scrape_empty
);
criterion_main!(benches);
