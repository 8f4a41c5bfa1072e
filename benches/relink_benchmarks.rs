//! Criterion benchmarks for index build, identity resolution and text rewriting.
//!
//! Run with: `cargo bench`
//!
//! Synthetic histories keep results comparable across machines.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use relink::{CommitRecord, IdentityIndex, RewriteContext, Rewriter};

// ─── Helpers ─────────────────────────────────────────────────────────

/// Deterministic 40-hex-digit identity for commit `n` on one side.
fn identity(side: u64, n: u64) -> String {
    let a = n.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ side;
    let b = a.rotate_left(17).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    let c = b.rotate_left(29) ^ n;
    format!("{:016x}{:016x}{:08x}", a, b, c as u32)
}

/// Two correlated histories of `count` commits, one second apart.
fn synthetic_histories(count: u64) -> (Vec<CommitRecord>, Vec<CommitRecord>) {
    let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).single().unwrap_or_default();
    let record = |side: u64, n: u64| CommitRecord {
        identity: identity(side, n),
        timestamp: start + Duration::seconds(n as i64),
        message: format!("Commit number {}", n),
        revision: (side == 0).then_some(n),
    };
    let old = (0..count).map(|n| record(0, n)).collect();
    let new = (0..count).map(|n| record(1, n)).collect();
    (old, new)
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for count in [1_000u64, 10_000, 50_000] {
        let (old, new) = synthetic_histories(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| IdentityIndex::build(black_box(&old), black_box(&new)))
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let (old, new) = synthetic_histories(50_000);
    let index = IdentityIndex::build(&old, &new);

    let full = identity(0, 31_337);
    let short = full[..12].to_string();
    let compound = format!("31337:{}", &full[..12]);

    group.bench_function("full_identity", |b| b.iter(|| index.resolve(black_box(&full))));
    group.bench_function("short_prefix", |b| b.iter(|| index.resolve(black_box(&short))));
    group.bench_function("revision_number", |b| b.iter(|| index.resolve(black_box("31337"))));
    group.bench_function("compound", |b| b.iter(|| index.resolve(black_box(&compound))));
    group.finish();
}

fn bench_convert_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_all");
    let (old, new) = synthetic_histories(10_000);
    let index = IdentityIndex::build(&old, &new);
    let Ok(ctx) = RewriteContext::new("https://bitbucket.org/owner/repo", "https://github.com/owner/repo") else {
        return;
    };
    let Ok(rewriter) = Rewriter::new(&index, ctx) else {
        return;
    };

    let hash = identity(0, 4_242);
    let comment = format!(
        "Fixed in <<cset {short}>>, see http://bitbucket.org/owner/repo/changeset/{short} \
         and https://bitbucket.org/owner/repo/src/{short}/docs/conf.py?at=default#cl-12 \
         (follow-up to https://bitbucket.org/owner/repo/issue/63/make-sphinx).",
        short = &hash[..12]
    );
    let plain = "Nothing to rewrite in this paragraph. ".repeat(200);

    group.bench_function("comment_with_references", |b| {
        b.iter(|| rewriter.convert_all(black_box(&comment)))
    });
    group.bench_function("plain_text_8k", |b| b.iter(|| rewriter.convert_all(black_box(&plain))));
    group.finish();
}

criterion_group!(benches, bench_index_build, bench_resolve, bench_convert_all);
criterion_main!(benches);
