use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netlog_receiver::{MetricsSnapshot, Receiver, Reporter, ResultRecord, SocketScanResults};

fn snapshot_with(sources: usize, destinations: usize) -> MetricsSnapshot {
    let receiver = Receiver::new();
    for i in 0..sources {
        let dests: Vec<String> = (0..destinations).map(|j| format!("10.1.0.{}", j)).collect();
        receiver
            .ingestor()
            .report_socket_scan_results(&SocketScanResults::new(vec![ResultRecord::from_parts(
                &format!("10.0.0.{}", i),
                &format!("pod-{}", i),
                dests,
            )]));
    }
    receiver.scrape()
}

/// Benchmark JSON serialization of snapshots with varying sizes
fn bench_json_serialization_varying_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_serialization");

    let configs = vec![
        ("small", 1, 5),     // 1 source, 5 destinations
        ("medium", 5, 20),   // 5 sources, 20 destinations each
        ("large", 10, 50),   // 10 sources, 50 destinations each
        ("xlarge", 20, 100), // 20 sources, 100 destinations each
    ];

    for (name, sources, destinations) in configs {
        let snapshot = snapshot_with(sources, destinations);

        let json = serde_json::to_string(&snapshot).unwrap();
        group.throughput(Throughput::Bytes(json.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(name), &snapshot, |b, snapshot| {
            b.iter(|| {
                black_box(serde_json::to_string(snapshot).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark pretty-printed JSON, as written by the file output
fn bench_json_serialization_pretty(c: &mut Criterion) {
    let snapshot = snapshot_with(5, 20);

    let mut group = c.benchmark_group("json_serialization_pretty");
    group.bench_function("pretty", |b| {
        b.iter(|| {
            black_box(serde_json::to_string_pretty(&snapshot).unwrap());
        });
    });
    group.finish();
}

/// Benchmark JSON deserialization
fn bench_json_deserialization(c: &mut Criterion) {
    let json = serde_json::to_string(&snapshot_with(5, 20)).unwrap();

    let mut group = c.benchmark_group("json_deserialization");
    group.bench_function("deserialize", |b| {
        b.iter(|| {
            let _: MetricsSnapshot = black_box(serde_json::from_str(&json).unwrap());
        });
    });
    group.finish();
}

/// Benchmark serialization to Vec<u8>, as written by the TCP output
fn bench_json_to_vec(c: &mut Criterion) {
    let snapshot = snapshot_with(10, 50);

    let mut group = c.benchmark_group("json_to_vec");
    group.bench_function("to_vec", |b| {
        b.iter(|| {
            black_box(serde_json::to_vec(&snapshot).unwrap());
        });
    });
    group.finish();
}

/// Benchmark serialization of an empty snapshot
fn bench_json_serialization_empty(c: &mut Criterion) {
    let snapshot = Receiver::new().scrape();

    let mut group = c.benchmark_group("json_serialization_empty");
    group.bench_function("empty", |b| {
        b.iter(|| {
            black_box(serde_json::to_string(&snapshot).unwrap());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_json_serialization_varying_sizes,
    bench_json_serialization_pretty,
    bench_json_deserialization,
    bench_json_to_vec,
    bench_json_serialization_empty
);
criterion_main!(benches);
