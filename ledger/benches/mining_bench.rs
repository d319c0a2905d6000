// Digest and mining benchmarks for the postchain ledger.
//
// Covers raw fold throughput, a full-ceiling nonce search (the worst case a
// caller can hit per post), and chain validation over a few hundred posts.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use postchain_ledger::digest::{fold_hash, Blake3Hash, FoldHash, HashFunction};
use postchain_ledger::{Clock, Ledger, LedgerConfig, ManualClock, Miner, NoopObserver, Post};

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest/fold");
    for size in [32usize, 256, 4096] {
        let input = "x".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| fold_hash(input));
        });
    }
    group.finish();
}

fn bench_blake3_vs_fold(c: &mut Criterion) {
    let preimage = "11700000000100helloalice22f92d8a42";
    c.bench_function("digest/fold_seal", |b| {
        b.iter(|| FoldHash.seal_digest(preimage));
    });
    c.bench_function("digest/blake3_seal", |b| {
        b.iter(|| Blake3Hash.seal_digest(preimage));
    });
}

fn bench_exhausting_search(c: &mut Criterion) {
    // Difficulty 2 is out of reach for this post, so the miner runs the
    // full ceiling every time.
    let template = Post::new("1", 1_700_000_000_100, "hello", "alice", "x", &FoldHash);
    let miner = Miner::default();

    c.bench_function("miner/exhaust_10k", |b| {
        b.iter(|| {
            let mut post = template.clone();
            miner.seal(&mut post, 2, "22f92d8a", &FoldHash, None)
        });
    });
}

fn bench_validation(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let config = LedgerConfig {
        max_attempts: 16,
        ..LedgerConfig::default()
    };
    let mut ledger = Ledger::with_parts(
        config,
        Arc::new(FoldHash),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    for i in 0..500 {
        clock.advance(1);
        ledger.create_post(&format!("post {i}"), "alice");
    }
    ledger.seal_pending(1, &NoopObserver);

    c.bench_function("ledger/validate_500", |b| {
        b.iter(|| ledger.is_valid());
    });
}

criterion_group!(
    benches,
    bench_fold,
    bench_blake3_vs_fold,
    bench_exhausting_search,
    bench_validation
);
criterion_main!(benches);
