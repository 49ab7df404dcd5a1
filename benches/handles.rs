//! Handle table and environment benchmarks
//!
//! Measures bind/unbind churn, pointer lookups and full collector cycles.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jsbridge::sim::{self, SimHost, SimRuntime};
use jsbridge::{ClassId, ClassKind, Environment, HandleTable, NativePtr, ReferencePolicy, Variant, VariantAllocator};

fn pointers(count: usize) -> Vec<NativePtr> {
    (1..=count)
        .filter_map(|i| NativePtr::new(i * 0x10))
        .collect()
}

fn bench_table_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_churn");

    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let pointers = pointers(size);
            let class_id = ClassId::new(0);
            let mut table: HandleTable<u32> = HandleTable::with_capacity(size);

            b.iter(|| {
                for (wrapper, &pointer) in pointers.iter().enumerate() {
                    let _ = table.bind(pointer, class_id, wrapper as u32, ReferencePolicy::Reference);
                }
                for &pointer in &pointers {
                    black_box(table.unbind(pointer));
                }
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let pointers = pointers(10_000);
    let class_id = ClassId::new(0);
    let mut table: HandleTable<u32> = HandleTable::with_capacity(pointers.len());
    for (wrapper, &pointer) in pointers.iter().enumerate() {
        let _ = table.bind(pointer, class_id, wrapper as u32, ReferencePolicy::Reference);
    }

    c.bench_function("lookup_hit", |b| {
        b.iter(|| {
            for &pointer in &pointers {
                black_box(table.lookup(pointer));
            }
        });
    });

    c.bench_function("resolve_wrapper", |b| {
        b.iter(|| {
            for &pointer in &pointers {
                black_box(table.get_wrapper(pointer));
            }
        });
    });
}

fn bench_collector_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("collector_cycle");

    for size in [100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut env = Environment::new(SimRuntime::new(), SimHost::new());
                let Ok(class_id) = env.register_class(ClassKind::HostObject, "Resource") else {
                    return;
                };

                for i in 0..size {
                    let pointer = env.host_mut().spawn(true);
                    let wrapper = env.runtime_mut().new_object();
                    let _ = env.bind_host_object(class_id, pointer, wrapper);
                    if i % 2 == 0 {
                        sim::add_native_reference(&mut env, pointer);
                        sim::release_native_reference(&mut env, pointer);
                    }
                    env.runtime_mut().release(wrapper);
                }
                env.gc();
                black_box(env.counters());
            });
        });
    }

    group.finish();
}

fn bench_variant_pool(c: &mut Criterion) {
    let allocator = VariantAllocator::new();

    c.bench_function("variant_alloc_free", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..256)
                .map(|i| allocator.alloc(Variant::Vector2([i as f32, 0.0])))
                .collect();
            for handle in handles {
                black_box(allocator.free(handle));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_table_churn,
    bench_lookup,
    bench_collector_cycle,
    bench_variant_pool,
);
criterion_main!(benches);
