use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use proxy_di::pool::{Poolable, ResourcePool};
use proxy_di::*;
use std::sync::Arc;
use std::time::Duration;

fn collection() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.with_config(ContainerConfig::default().with_sweep_interval(None));
    sc
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut sc = collection();
    sc.add_singleton(42u64);
    let sp = sc.build();

    // Prime the singleton
    let _ = sp.get_required::<u64>();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = sp.get_required::<u64>();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut sc = collection();
                sc.add_singleton_factory::<ExpensiveToCreate, _>(|_| {
                    Ok(ExpensiveToCreate { data: (0..1000).collect() })
                });
                sc.build()
            },
            |sp| {
                let v = sp.get_required::<ExpensiveToCreate>();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let mut sc_scoped = collection();
    sc_scoped.add_scoped_factory::<Service, _>(|_| Ok(Service { data: [0; 64] }));
    let sp_scoped = sc_scoped.build();
    let scope = sp_scoped.create_scope();
    let _ = scope.get_required::<Service>();

    group.bench_function("scoped_hit", |b| {
        b.iter(|| black_box(scope.get_required::<Service>().data[0]))
    });

    let mut sc_transient = collection();
    sc_transient.add_transient_factory::<Service, _>(|_| Ok(Service { data: [0; 64] }));
    let sp_transient = sc_transient.build();

    group.bench_function("transient_build", |b| {
        b.iter(|| black_box(sp_transient.get_required::<Service>().data[0]))
    });

    group.finish();
}

// ===== Container-built types =====

struct Repo;

struct Handler {
    repo: Option<Arc<Repo>>,
    audit: Option<Arc<Repo>>,
}

impl Injectable for Handler {
    fn describe(plan: &mut Blueprint<Self>) {
        plan.constructor(Accessibility::Public)
            .service::<Repo>("repo")
            .value::<u32>("retries")
            .build(|args| Ok(Handler { repo: args.service(0), audit: None }));
        plan.field::<Repo>("audit")
            .inject(Inject::new())
            .set(|h, repo| h.audit = repo);
    }
}

fn bench_proxy_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("container_built");

    let mut sc = collection();
    sc.add_singleton(Repo);
    sc.add_type::<Handler>(Lifetime::Transient);
    let sp = sc.build();
    let _ = sp.get_required::<Handler>();

    group.bench_function("cached_proxy", |b| {
        b.iter(|| {
            let h = sp.get_required::<Handler>();
            black_box(h.repo.is_some() && h.audit.is_some());
        })
    });

    group.bench_function("with_overrides", |b| {
        let overrides = [OverrideParameter::value(3u32).named("retries")];
        b.iter(|| black_box(sp.resolve_with::<Handler>(None, &overrides).unwrap()))
    });

    group.bench_function("proxy_rebuild", |b| {
        b.iter(|| black_box(TypeProxy::from_blueprint(TypeBlueprint::of::<Handler>()).unwrap()))
    });

    group.finish();
}

// ===== Scaling =====

fn bench_dependency_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");

    for depth in [1usize, 4, 16, 64] {
        let mut sc = collection();
        for level in 0..depth {
            let name: &'static str = Box::leak(format!("n{}", level).into_boxed_str());
            let next: Option<&'static str> = (level + 1 < depth)
                .then(|| &*Box::leak(format!("n{}", level + 1).into_boxed_str()));
            sc.add_named_factory::<u64, _>(name, Lifetime::Transient, move |r| match next {
                Some(next) => Ok(Arc::new(*r.resolve_required_named::<u64>(next)? + 1)),
                None => Ok(Arc::new(0)),
            });
        }
        let sp = sc.build();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(*sp.get_named_required::<u64>("n0")))
        });
    }

    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut sc = collection();
    sc.add_singleton(42u64);
    let sp = sc.build();
    let _ = sp.get_required::<u64>();

    c.bench_function("singleton_hit_4_threads", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..100 {
                            black_box(sp.get_required::<u64>());
                        }
                    });
                }
            });
        })
    });
}

struct Slot(usize);
impl Poolable for Slot {}

fn bench_pool_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_lookup");

    for size in [8usize, 64, 512] {
        let pool: ResourcePool<Arc<Slot>> = ResourcePool::new("bench", Duration::from_secs(60));
        for i in 0..size {
            let _ = pool.get_or_add(|s| s.0 == i, || Ok(Arc::new(Slot(i))));
        }
        let last = size - 1;

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(pool.get_or_add(|s| s.0 == last, || unreachable!()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    micro_benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_scoped_vs_transient,
    bench_proxy_build,
);

criterion_group!(macro_benches, bench_dependency_chain_depth, bench_contention, bench_pool_lookup);

criterion_main!(micro_benches, macro_benches);
