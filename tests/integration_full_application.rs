/// Full application integration tests
///
/// Wires a small application out of container-built types behind trait
/// contracts and checks the object graph the container produces.

use proxy_di::{
    Accessibility, Blueprint, ContainerConfig, Inject, Injectable, Lifetime, Resolver, ServiceCollection,
    ServiceProvider,
};
use std::any::Any;
use std::sync::Arc;

// ===== Contracts =====

trait Repository: Send + Sync {
    fn find(&self, id: u32) -> Option<String>;
    fn as_any(&self) -> &dyn Any;
}

trait Service: Send + Sync {
    fn describe_user(&self, id: u32) -> String;
    fn repository(&self) -> Arc<dyn Repository>;
    fn as_any(&self) -> &dyn Any;
}

// ===== Implementations =====

struct RepoImpl {
    users: Vec<(u32, &'static str)>,
}

impl Injectable for RepoImpl {
    fn describe(plan: &mut Blueprint<Self>) {
        plan.constructor(Accessibility::Public)
            .build(|_| Ok(RepoImpl { users: vec![(1, "ada"), (2, "grace")] }));
    }
}

impl Repository for RepoImpl {
    fn find(&self, id: u32) -> Option<String> {
        self.users.iter().find(|(uid, _)| *uid == id).map(|(_, name)| name.to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ServiceImpl {
    repo: Arc<dyn Repository>,
    greeting: Option<Arc<String>>,
}

impl Injectable for ServiceImpl {
    fn describe(plan: &mut Blueprint<Self>) {
        // Never elected: a preferred constructor exists.
        plan.constructor(Accessibility::Public)
            .service::<dyn Repository>("repo")
            .service::<String>("greeting")
            .build(|args| Ok(ServiceImpl { repo: args.required(0)?, greeting: args.service(1) }));
        plan.constructor(Accessibility::Internal)
            .preferred()
            .service::<dyn Repository>("repo")
            .build(|args| Ok(ServiceImpl { repo: args.required(0)?, greeting: None }));
        plan.property::<String>("greeting")
            .inject(Inject::new().key("greeting"))
            .set(|svc, greeting| svc.greeting = greeting);
    }
}

impl Service for ServiceImpl {
    fn describe_user(&self, id: u32) -> String {
        let greeting = self.greeting.as_deref().map(String::as_str).unwrap_or("hi");
        match self.repo.find(id) {
            Some(name) => format!("{} {}", greeting, name),
            None => format!("{} stranger", greeting),
        }
    }

    fn repository(&self) -> Arc<dyn Repository> {
        self.repo.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn application() -> ServiceProvider {
    let mut sc = ServiceCollection::new();
    sc.with_config(ContainerConfig::default().with_sweep_interval(None));
    sc.add_trait_type::<dyn Service, ServiceImpl, _>(Lifetime::Singleton, |s| s as Arc<dyn Service>);
    sc.add_trait_type::<dyn Repository, RepoImpl, _>(Lifetime::Singleton, |r| r as Arc<dyn Repository>);
    sc.add_named_singleton("greeting", "hello".to_string());
    sc.build()
}

#[test]
fn test_service_graph_is_built_and_shared() {
    let sp = application();

    let service = sp.resolve_required::<dyn Service>().unwrap();
    assert!(service.as_any().is::<ServiceImpl>());
    assert!(service.repository().as_any().is::<RepoImpl>());

    let again = sp.resolve_required::<dyn Service>().unwrap();
    assert!(Arc::ptr_eq(&service, &again));
    assert!(Arc::ptr_eq(&service.repository(), &again.repository()));

    let repo = sp.resolve_required::<dyn Repository>().unwrap();
    assert!(Arc::ptr_eq(&service.repository(), &repo));
}

#[test]
fn test_service_behaviour_through_contracts() {
    let sp = application();
    let service = sp.get_required::<dyn Service>();

    assert_eq!(service.describe_user(1), "hello ada");
    assert_eq!(service.describe_user(9), "hello stranger");
}

#[test]
fn test_scopes_share_application_singletons() {
    let sp = application();
    let root = sp.get_required::<dyn Service>();

    let scope = sp.create_scope();
    let nested = scope.create_scope();
    assert!(Arc::ptr_eq(&root, &scope.get_required::<dyn Service>()));
    assert!(Arc::ptr_eq(&root, &nested.get_required::<dyn Service>()));
}

#[test]
fn test_repeated_resolution_reuses_the_graph() {
    let sp = application();
    let repo = sp.get_required::<dyn Repository>();
    for _ in 0..5 {
        assert!(Arc::ptr_eq(&repo, &sp.get_required::<dyn Service>().repository()));
        assert!(Arc::ptr_eq(&repo, &sp.get_required::<dyn Repository>()));
    }
}

#[test]
fn test_diagnostics_describe_registrations() {
    let sp = application();
    let descriptors = sp.descriptors();
    assert_eq!(descriptors.len(), 3);

    let service = descriptors.iter().find(|d| d.type_name().contains("Service")).unwrap();
    assert_eq!(service.lifetime, Lifetime::Singleton);
    assert!(service.impl_type_name.unwrap().ends_with("ServiceImpl"));

    let greeting = descriptors.iter().find(|d| d.is_named()).unwrap();
    assert_eq!(greeting.service_name(), Some("greeting"));
    assert!(greeting.impl_type_name.is_none());

    assert_eq!(sp.proxy_cache_len(), 0);
    sp.get_required::<dyn Service>();
    assert_eq!(sp.proxy_cache_len(), 2);
}

#[test]
fn test_evicted_proxies_are_rebuilt_transparently() {
    let mut sc = ServiceCollection::new();
    sc.with_config(
        ContainerConfig::default()
            .with_sweep_interval(None)
            .with_proxy_idle_expiry(std::time::Duration::ZERO),
    );
    sc.add_trait_type::<dyn Repository, RepoImpl, _>(Lifetime::Transient, |r| r as Arc<dyn Repository>);
    let sp = sc.build();

    sp.get_required::<dyn Repository>();
    assert_eq!(sp.proxy_cache_len(), 1);
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert_eq!(sp.sweep_proxies(), 1);
    assert_eq!(sp.proxy_cache_len(), 0);

    assert_eq!(sp.get_required::<dyn Repository>().find(2).as_deref(), Some("grace"));
    assert_eq!(sp.proxy_cache_len(), 1);
}
