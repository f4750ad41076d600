use core::hint::black_box;
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use gidalloc::{
    ABSOLUTE_GID_MAX, ABSOLUTE_GID_MIN, BasicRangeAllocator, Gid, LockRangeAllocator, Snapshot,
    Volume, recovery,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

// Number of gids allocated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

fn full_table() -> BasicRangeAllocator {
    BasicRangeAllocator::new(ABSOLUTE_GID_MIN, ABSOLUTE_GID_MAX).unwrap()
}

/// A table where every other gid in the first `holes * 2` ids is taken, so
/// each allocation fills a hole and merges two runs.
fn fragmented_table(holes: Gid) -> BasicRangeAllocator {
    let mut table = full_table();
    for gid in (ABSOLUTE_GID_MIN..ABSOLUTE_GID_MIN + holes * 2).step_by(2) {
        table.allocate(gid).unwrap();
    }
    table
}

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic/sequential");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("empty/elems/{TOTAL_IDS}"), |b| {
        b.iter_batched(
            full_table,
            |mut table| {
                for _ in 0..TOTAL_IDS {
                    black_box(table.allocate_next().unwrap());
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function(format!("fragmented/elems/{TOTAL_IDS}"), |b| {
        b.iter_batched(
            || fragmented_table(TOTAL_IDS as Gid),
            |mut table| {
                for _ in 0..TOTAL_IDS {
                    black_box(table.allocate_next().unwrap());
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_release_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic/release_reuse");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        let mut table = full_table();
        for _ in 0..TOTAL_IDS * 4 {
            table.allocate_next().unwrap();
        }
        b.iter(|| {
            for i in 0..TOTAL_IDS as Gid {
                let gid = ABSOLUTE_GID_MIN + i * 3;
                table.release(gid);
                black_box(table.allocate_next().unwrap());
            }
        });
    });

    group.finish();
}

/// Shared table across threads.
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock/contended");

    for thread_count in [1, 2, 4, 8, 16] {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(
            format!("elems/{TOTAL_IDS}/threads/{thread_count}"),
            |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();

                    for _ in 0..iters {
                        let table = LockRangeAllocator::from(full_table());
                        let barrier = Arc::new(Barrier::new(thread_count + 1));
                        scope(|s| {
                            for _ in 0..thread_count {
                                let table = table.clone();
                                let barrier = Arc::clone(&barrier);
                                s.spawn(move || {
                                    barrier.wait();
                                    for _ in 0..ids_per_thread {
                                        black_box(table.allocate_next().unwrap());
                                    }
                                });
                            }
                            barrier.wait();
                        });
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery/seed");

    for volume_count in [1_000, 10_000, 100_000] {
        let snapshot = Snapshot {
            classes: vec![],
            volumes: (0..volume_count)
                .map(|i| {
                    let class = if i % 2 == 0 { "even" } else { "odd" };
                    Volume::new(format!("pv-{i}"), class).with_gid(ABSOLUTE_GID_MIN + i)
                })
                .collect(),
        };

        group.throughput(Throughput::Elements(u64::from(volume_count)));
        group.bench_function(format!("volumes/{volume_count}"), |b| {
            b.iter_batched(
                full_table,
                |mut table| black_box(recovery::seed("even", &snapshot.volumes, &mut table)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential,
    bench_release_reuse,
    bench_contended,
    bench_recovery,
);
criterion_main!(benches);
