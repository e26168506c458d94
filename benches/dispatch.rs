//! Listener dispatch benchmark suite.
//!
//! Benchmarks registry dispatch and subscription churn at different
//! listener counts: 1, 8, 64, 512.
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use wss_self_signed::{Event, EventKind, ListenerRegistry};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LISTENER_COUNTS: &[usize] = &[1, 8, 64, 512];

// ============================================================================
// Benchmark: Dispatch Fan-Out
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for &count in LISTENER_COUNTS {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        for _ in 0..count {
            let hits = Arc::clone(&hits);
            registry.subscribe(EventKind::Message, move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }

        let event = Event::Message("benchmark payload".to_owned());
        group.bench_with_input(
            BenchmarkId::new("text", count),
            &registry,
            |b, registry| {
                b.iter(|| registry.dispatch(&event));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Subscription Churn
// ============================================================================

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription_churn");

    for &count in LISTENER_COUNTS {
        group.bench_with_input(
            BenchmarkId::new("subscribe_then_remove", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let registry = ListenerRegistry::new();
                    let handles: Vec<_> = (0..count)
                        .map(|_| registry.subscribe(EventKind::Open, |_| {}))
                        .collect();
                    for handle in handles {
                        registry.unsubscribe(handle);
                    }
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_dispatch, bench_subscribe_unsubscribe);
criterion_main!(benches);
