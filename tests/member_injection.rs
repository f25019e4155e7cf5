use proxy_di::{
    Accessibility, Blueprint, ContainerConfig, DiError, Inject, Injectable, Lifetime, Resolver, ServiceCollection,
};
use std::sync::Arc;

fn collection() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.with_config(ContainerConfig::default().with_sweep_interval(None));
    sc
}

struct Clock(&'static str);
struct Metrics;

#[derive(Default)]
struct Worker {
    clock: Option<Arc<Clock>>,
    backup_clock: Option<Arc<Clock>>,
    metrics: Option<Arc<Metrics>>,
    unmarked: Option<Arc<Clock>>,
    started_with: Option<&'static str>,
    init_calls: u32,
    helper_calls: u32,
}

impl Injectable for Worker {
    fn describe(plan: &mut Blueprint<Self>) {
        plan.constructor(Accessibility::Public).build(|_| Ok(Worker::default()));

        plan.field::<Clock>("clock")
            .inject(Inject::new())
            .set(|w, clock| w.clock = clock);
        plan.property::<Clock>("backup_clock")
            .inject(Inject::new().key("backup"))
            .set(|w, clock| w.backup_clock = clock);
        plan.property::<Metrics>("metrics")
            .inject(Inject::new())
            .set(|w, metrics| w.metrics = metrics);
        plan.field::<Clock>("unmarked").set(|w, clock| w.unmarked = clock);
        plan.property::<Clock>("current").inject(Inject::new()).read_only();

        plan.method("start")
            .inject()
            .service::<Clock>("clock")
            .call(|w, args| {
                w.started_with = Some(args.required::<Clock>(0)?.0);
                w.init_calls += 1;
                Ok(())
            });
        plan.method("helper").call(|w, _| {
            w.helper_calls += 1;
            Ok(())
        });
    }
}

#[test]
fn test_marked_members_are_injected() {
    let mut sc = collection();
    sc.add_singleton(Clock("main"));
    sc.add_named_singleton("backup", Clock("backup"));
    sc.add_type::<Worker>(Lifetime::Transient);

    let worker = sc.build().get_required::<Worker>();

    assert_eq!(worker.clock.as_ref().unwrap().0, "main");
    assert_eq!(worker.backup_clock.as_ref().unwrap().0, "backup");
    assert!(worker.unmarked.is_none());
}

#[test]
fn test_unresolvable_member_is_left_empty() {
    let mut sc = collection();
    sc.add_singleton(Clock("main"));
    sc.add_type::<Worker>(Lifetime::Transient);

    let worker = sc.build().get_required::<Worker>();
    assert!(worker.metrics.is_none());
    assert!(worker.backup_clock.is_none());
}

#[test]
fn test_only_marked_methods_run_once() {
    let mut sc = collection();
    sc.add_singleton(Clock("main"));
    sc.add_type::<Worker>(Lifetime::Transient);

    let worker = sc.build().get_required::<Worker>();
    assert_eq!(worker.started_with, Some("main"));
    assert_eq!(worker.init_calls, 1);
    assert_eq!(worker.helper_calls, 0);
}

#[test]
fn test_failing_method_abandons_the_build() {
    let mut sc = collection();
    sc.add_type::<Worker>(Lifetime::Singleton);
    let sp = sc.build();

    // No Clock registered: `start` requires one.
    let err = sp.resolve_required::<Worker>().err().unwrap();
    assert!(matches!(err, DiError::Unresolved(ref m) if m.contains("Clock")));

    sp.register(proxy_di::Descriptor::instance::<Clock>(None, Arc::new(Clock("late"))))
        .unwrap();
    assert_eq!(sp.get_required::<Worker>().started_with, Some("late"));
}

#[test]
fn test_members_resolve_with_lifetimes() {
    struct Session {
        metrics: Option<Arc<Metrics>>,
    }

    impl Injectable for Session {
        fn describe(plan: &mut Blueprint<Self>) {
            plan.constructor(Accessibility::Public).build(|_| Ok(Session { metrics: None }));
            plan.property::<Metrics>("metrics")
                .inject(Inject::new())
                .set(|s, m| s.metrics = m);
        }
    }

    let mut sc = collection();
    sc.add_scoped_factory::<Metrics, _>(|_| Ok(Metrics));
    sc.add_type::<Session>(Lifetime::Transient);

    let sp = sc.build();
    let scope = sp.create_scope();
    let a = scope.get_required::<Session>();
    let b = scope.get_required::<Session>();
    let other = sp.create_scope().get_required::<Session>();

    let ma = a.metrics.as_ref().unwrap();
    assert!(Arc::ptr_eq(ma, b.metrics.as_ref().unwrap()));
    assert!(!Arc::ptr_eq(ma, other.metrics.as_ref().unwrap()));
}

#[test]
fn test_trait_contract_from_container_built_type() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Polite {
        clock: Option<Arc<Clock>>,
    }

    impl Greeter for Polite {
        fn greet(&self) -> String {
            match &self.clock {
                Some(clock) => format!("good {}", clock.0),
                None => "hello".to_string(),
            }
        }
    }

    impl Injectable for Polite {
        fn describe(plan: &mut Blueprint<Self>) {
            plan.constructor(Accessibility::Public).build(|_| Ok(Polite { clock: None }));
            plan.field::<Clock>("clock").inject(Inject::new()).set(|p, c| p.clock = c);
        }
    }

    let mut sc = collection();
    sc.add_singleton(Clock("morning"));
    sc.add_trait_type::<dyn Greeter, Polite, _>(Lifetime::Singleton, |p| p as Arc<dyn Greeter>);
    sc.add_named_trait_type::<dyn Greeter, Polite, _>("fresh", Lifetime::Transient, |p| p as Arc<dyn Greeter>);

    let sp = sc.build();
    assert_eq!(sp.get_required::<dyn Greeter>().greet(), "good morning");
    assert!(Arc::ptr_eq(&sp.get_required::<dyn Greeter>(), &sp.get_required::<dyn Greeter>()));
    assert!(!Arc::ptr_eq(
        &sp.get_named_required::<dyn Greeter>("fresh"),
        &sp.get_named_required::<dyn Greeter>("fresh")
    ));
    assert!(sp.resolve::<Polite>().unwrap().is_none());
    assert_eq!(sp.proxy_cache_len(), 1);
}
