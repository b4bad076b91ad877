//! Cache hot-path benchmarks
//!
//! Measures the acquire hit path (the common case during a test run, where
//! most classes reuse an already-constructed context), key derivation from
//! descriptors, and the statistics snapshot.
//!
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use context_cache::{CacheConfig, ContextCache, ContextDescriptor, ContextKey};

fn descriptor(component: &str) -> ContextDescriptor {
    ContextDescriptor::builder()
        .loader("AnnotationConfigLoader")
        .component(component)
        .profiles(vec!["integration".to_string()])
        .build()
}

async fn warmed_cache(key: &ContextKey) -> ContextCache<String> {
    let cache = ContextCache::new(CacheConfig::default());
    cache
        .acquire(key, None, || async { Ok("context".to_string()) })
        .await
        .expect("warm-up acquire");
    cache
}

/// Acquire of an already-constructed context.
fn bench_acquire_hit(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let key = descriptor("AppConfig").derive_key();
    let cache = rt.block_on(warmed_cache(&key));

    c.bench_function("acquire_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let context = cache
                .acquire(black_box(&key), None, || async {
                    Ok("context".to_string())
                })
                .await
                .expect("acquire");
            black_box(context)
        })
    });
}

/// Structural key derivation from a two-level descriptor chain.
fn bench_derive_key(c: &mut Criterion) {
    let parent = descriptor("ParentConfig");
    let child = ContextDescriptor::builder()
        .loader("AnnotationConfigLoader")
        .component("ChildConfig")
        .parent(parent)
        .build();

    c.bench_function("derive_key", |b| {
        b.iter(|| black_box(child.derive_key()))
    });
}

/// Statistics snapshot over a populated cache.
fn bench_statistics(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let cache = rt.block_on(async {
        let cache = ContextCache::new(CacheConfig::default());
        for i in 0..64 {
            let key = descriptor(&format!("Config{i}")).derive_key();
            cache
                .acquire(&key, None, || async { Ok("context".to_string()) })
                .await
                .expect("acquire");
        }
        cache
    });

    c.bench_function("statistics", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.statistics().await) })
    });
}

criterion_group!(benches, bench_acquire_hit, bench_derive_key, bench_statistics);
criterion_main!(benches);
