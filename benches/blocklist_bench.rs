//! Benchmarks for blocklist domain lookup.
//!
//! Measures how quickly we can check if a domain is blocked, against the
//! bundled lists and against a large synthetic snapshot.

use criterion::{BenchmarkId, Criterion, Throughput, black_box};

use sinkhole::config::Config;
use sinkhole::filter::{Blocklist, BlocklistSnapshot, DomainFilter};
use sinkhole::proxy::build_blocklist;

fn bench_contains(c: &mut Criterion) {
    let bundled = build_blocklist(&Config::default());
    let large = Blocklist::new(BlocklistSnapshot::new(
        (0..200_000).map(|i| format!("tracker{}.example", i)),
    ));

    let mut group = c.benchmark_group("blocklist");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("contains", "bundled_hit"), |b| {
        b.iter(|| bundled.contains(black_box("doubleclick.net")))
    });

    group.bench_function(BenchmarkId::new("contains", "bundled_miss"), |b| {
        b.iter(|| bundled.contains(black_box("www.google.com")))
    });

    // Uppercase input takes the lowercasing path
    group.bench_function(BenchmarkId::new("contains", "mixed_case_hit"), |b| {
        b.iter(|| bundled.contains(black_box("DoubleClick.NET")))
    });

    group.bench_function(BenchmarkId::new("contains", "large_hit"), |b| {
        b.iter(|| large.contains(black_box("tracker123456.example")))
    });

    group.bench_function(BenchmarkId::new("contains", "large_miss"), |b| {
        b.iter(|| large.contains(black_box("a.b.c.d.e.f.example.org")))
    });

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_contains(&mut criterion);
    criterion.final_summary();
}
