//! Performance benchmarks for language classification and mention extraction.
//!
//! Run with: `cargo bench --bench classify`
//!
//! Both run once per processed community on at most five posts plus a
//! profile description, so they should stay well under a millisecond.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use outreach_kernel::{classify, extract_mentions, CommunityId};

const RU_POST: &str = "Ежедневный обзор рынка криптовалют. Реклама: пишите в личные сообщения. ";
const EN_POST: &str = "Daily crypto market digest. For ads contact the admin directly. ";

/// Build `count` posts of roughly `len` bytes each, alternating scripts.
fn make_posts(count: usize, len: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let base = if i % 2 == 0 { RU_POST } else { EN_POST };
            base.repeat(len / base.len() + 1)
        })
        .collect()
}

/// Benchmark classification over post samples of increasing size.
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for len in [100, 1_000, 4_000] {
        let posts = make_posts(5, len);
        let bytes: usize = posts.iter().map(String::len).sum();

        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::new("post_bytes", len), &posts, |b, posts| {
            b.iter(|| classify(black_box(posts).iter().map(String::as_str)))
        });
    }

    group.finish();
}

/// Benchmark mention extraction from a busy profile description.
fn bench_extract_mentions(c: &mut Criterion) {
    let own = CommunityId::parse("cryptodigest").unwrap();
    let description: String = (0..50)
        .map(|i| format!("Partner @partner_{i}, ads @cryptodigest. "))
        .collect();

    c.bench_function("extract_mentions_50", |b| {
        b.iter(|| extract_mentions(black_box(&description), &own))
    });
}

criterion_group!(benches, bench_classify, bench_extract_mentions);
criterion_main!(benches);
