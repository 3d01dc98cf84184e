//! Benchmarks for denylist lookup.
//!
//! Measures suffix-walk matching against a populated set, plus the
//! normalization pass that precedes it.

use criterion::{black_box, BenchmarkId, Criterion, Throughput};

use sinkhole::filter::{normalize, Blocklist};

fn populated_blocklist() -> Blocklist {
    (0..50_000)
        .map(|i| format!("tracker{i}.example{}.com", i % 997))
        .chain(["doubleclick.net".to_string(), "ads.com".to_string()])
        .collect()
}

fn bench_matches(c: &mut Criterion) {
    let blocklist = populated_blocklist();

    let mut group = c.benchmark_group("blocklist");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("matches", "exact_match"), |b| {
        b.iter(|| blocklist.matches(black_box("doubleclick.net")))
    });

    group.bench_function(BenchmarkId::new("matches", "subdomain_match"), |b| {
        b.iter(|| blocklist.matches(black_box("ads.tracking.doubleclick.net")))
    });

    group.bench_function(BenchmarkId::new("matches", "miss"), |b| {
        b.iter(|| blocklist.matches(black_box("www.google.com")))
    });

    group.bench_function(BenchmarkId::new("matches", "deep_miss"), |b| {
        b.iter(|| blocklist.matches(black_box("a.b.c.d.e.f.example.org")))
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    group.bench_function(BenchmarkId::new("normalize", "plain"), |b| {
        b.iter(|| normalize(black_box("sub.example.com")))
    });

    group.bench_function(BenchmarkId::new("normalize", "url"), |b| {
        b.iter(|| normalize(black_box("https://Sub.Example.COM/path?q=1#frag")))
    });

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_matches(&mut criterion);
    bench_normalize(&mut criterion);
    criterion.final_summary();
}
