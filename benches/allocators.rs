//! Benchmarks for scopealloc against bumpalo and the system allocator.
//!
//! Run with: cargo bench

use std::alloc::{alloc, dealloc, Layout};

use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scopealloc::{mb, Arena, FreeList, MemoryScope};

// =============================================================================
// SINGLE ALLOCATION BENCHMARKS
// =============================================================================

fn bench_single_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_alloc");

    for size in [64usize, 1024, 4096] {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("arena", size), &size, |b, &size| {
            let mut arena = Arena::new(mb(64)).unwrap();
            b.iter(|| {
                if arena.remaining() < size + 16 {
                    arena.reset();
                }
                black_box(arena.allocate(size, 16).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("bumpalo", size), &size, |b, &size| {
            let mut bump = Bump::with_capacity(mb(64));
            let layout = Layout::from_size_align(size, 16).unwrap();
            b.iter(|| {
                if bump.allocated_bytes() > mb(60) {
                    bump.reset();
                }
                black_box(bump.alloc_layout(layout));
            });
        });

        group.bench_with_input(BenchmarkId::new("free_list", size), &size, |b, &size| {
            let mut list = FreeList::new(mb(64)).unwrap();
            b.iter(|| {
                let ptr = list.allocate(size, 16).unwrap();
                black_box(ptr);
                unsafe { list.deallocate(ptr.as_ptr()) };
            });
        });

        group.bench_with_input(BenchmarkId::new("system_malloc", size), &size, |b, &size| {
            let layout = Layout::from_size_align(size, 16).unwrap();
            b.iter(|| unsafe {
                let ptr = alloc(layout);
                black_box(ptr);
                dealloc(ptr, layout);
            });
        });
    }

    group.finish();
}

// =============================================================================
// BATCH ALLOCATION BENCHMARKS
// =============================================================================

fn bench_frame_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_batch_1000x64B");
    group.throughput(Throughput::Bytes(1000 * 64));

    group.bench_function("arena", |b| {
        let mut arena = Arena::new(mb(1)).unwrap();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(arena.alloc::<[u8; 64]>().unwrap());
            }
            arena.reset();
        });
    });

    group.bench_function("bumpalo", |b| {
        let mut bump = Bump::with_capacity(mb(1));
        b.iter(|| {
            for _ in 0..1000 {
                black_box(bump.alloc([0u8; 64]));
            }
            bump.reset();
        });
    });

    group.bench_function("system_malloc", |b| {
        let layout = Layout::new::<[u8; 64]>();
        b.iter(|| {
            let ptrs: Vec<*mut u8> = (0..1000).map(|_| unsafe { alloc(layout) }).collect();
            for ptr in ptrs {
                unsafe { dealloc(black_box(ptr), layout) };
            }
        });
    });

    group.finish();
}

// =============================================================================
// FREE LIST CHURN
// =============================================================================

fn bench_free_list_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_list_churn");

    // Free every other block first so the list has to coalesce both ways.
    group.bench_function("alloc_100_free_interleaved", |b| {
        let mut list = FreeList::new(mb(1)).unwrap();
        b.iter(|| {
            let ptrs: Vec<_> = (0..100).map(|i| list.allocate(32 + (i % 8) * 16, 8).unwrap()).collect();
            for ptr in ptrs.iter().step_by(2) {
                unsafe { list.deallocate(ptr.as_ptr()) };
            }
            for ptr in ptrs.iter().skip(1).step_by(2) {
                unsafe { list.deallocate(ptr.as_ptr()) };
            }
            black_box(list.free_block_count());
        });
    });

    group.bench_function("alloc_100_free_reverse", |b| {
        let mut list = FreeList::new(mb(1)).unwrap();
        b.iter(|| {
            let ptrs: Vec<_> = (0..100).map(|_| list.allocate(128, 16).unwrap()).collect();
            for ptr in ptrs.iter().rev() {
                unsafe { list.deallocate(ptr.as_ptr()) };
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_alloc, bench_frame_batch, bench_free_list_churn);
criterion_main!(benches);
