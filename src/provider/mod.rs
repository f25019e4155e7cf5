//! Service provider and the resolution manager behind it.
//!
//! A provider tree is a chain of levels: the root level owned by the
//! [`ServiceProvider`] and one level per [`Scope`]. Each level holds its own
//! registrations and one storager per descriptor it has resolved. Lookups
//! walk from the requesting level towards the root; singleton storagers live
//! in the level that owns the registration and are shared downwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::ContainerConfig;
use crate::descriptors::{Descriptor, Producer, ServiceDescriptor};
use crate::error::DiResult;
use crate::internal::{AsyncHook, BuildGuard, DisposeBag, SyncHook};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::overrides::OverrideParameter;
use crate::pool::PoolSweeper;
use crate::proxy::ProxyCache;
use crate::registration::{AnyArc, Inserted, Registry};
use crate::storager::{self, Acquired, Storager};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// One node of the provider tree.
pub(crate) struct Level {
    depth: usize,
    parent: Option<Arc<Level>>,
    registry: RwLock<Registry>,
    storagers: RwLock<HashMap<u64, Arc<dyn Storager>>>,
    disposers: Mutex<DisposeBag>,
}

impl Level {
    fn root(registry: Registry) -> Arc<Self> {
        Arc::new(Self {
            depth: 0,
            parent: None,
            registry: RwLock::new(registry),
            storagers: RwLock::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
        })
    }

    /// A child level: no registrations of its own, singleton storagers inherited.
    pub(crate) fn child(self: &Arc<Self>) -> Arc<Self> {
        let inherited: HashMap<u64, Arc<dyn Storager>> = self
            .storagers
            .read()
            .iter()
            .filter_map(|(id, s)| s.clone().inherit().map(|s| (*id, s)))
            .collect();

        Arc::new(Self {
            depth: self.depth + 1,
            parent: Some(self.clone()),
            registry: RwLock::new(Registry::new()),
            storagers: RwLock::new(inherited),
            disposers: Mutex::new(DisposeBag::default()),
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// The nearest descriptor for `key` and the level that owns it.
    fn find(self: &Arc<Self>, key: &Key) -> Option<(Arc<Level>, Arc<Descriptor>)> {
        let mut current = Some(self);
        while let Some(level) = current {
            if let Some(descriptor) = level.registry.read().get(key) {
                return Some((level.clone(), descriptor.clone()));
            }
            current = level.parent.as_ref();
        }
        None
    }

    pub(crate) fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry.read().iter().map(|d| d.snapshot()).collect()
    }

    pub(crate) fn push_sync_disposer(&self, service: &'static str, hook: SyncHook) {
        self.disposers.lock().push_sync(service, hook);
    }

    pub(crate) fn push_async_disposer(&self, service: &'static str, hook: AsyncHook) {
        self.disposers.lock().push_async(service, hook);
    }

    /// Runs and clears this level's disposal hooks.
    pub(crate) async fn dispose_all(&self) {
        let bag = std::mem::take(&mut *self.disposers.lock());
        bag.run_all().await;
    }

    pub(crate) fn undisposed(&self) -> usize {
        self.disposers.lock().len()
    }
}

/// Shared state of one provider tree.
pub(crate) struct ProviderInner {
    root: Arc<Level>,
    proxies: ProxyCache,
    observers: Observers,
    config: ContainerConfig,
    sweeper: Mutex<Option<PoolSweeper>>,
}

impl ProviderInner {
    pub(crate) fn register_at(&self, level: &Arc<Level>, descriptor: Descriptor) -> DiResult<()> {
        let descriptor = Arc::new(descriptor);
        let outcome = level
            .registry
            .write()
            .insert(descriptor.clone(), self.config.duplicate_policy)?;

        match outcome {
            Inserted::Added | Inserted::Replaced => debug!(
                target: "proxy_di",
                service = %descriptor.key(),
                lifetime = ?descriptor.lifetime(),
                depth = level.depth,
                replaced = outcome == Inserted::Replaced,
                "registered"
            ),
            Inserted::Ignored => debug!(
                target: "proxy_di",
                service = %descriptor.key(),
                depth = level.depth,
                "duplicate registration ignored"
            ),
        }
        Ok(())
    }

    /// The storager guarding `descriptor` as seen from `level`.
    ///
    /// Singletons always use the owner's storager; scoped and transient
    /// descriptors get one per requesting level.
    fn storager_for(&self, level: &Arc<Level>, owner: &Arc<Level>, descriptor: &Descriptor) -> Arc<dyn Storager> {
        if let Some(existing) = level.storagers.read().get(&descriptor.id()) {
            return existing.clone();
        }

        let created = if descriptor.lifetime() == Lifetime::Singleton && !Arc::ptr_eq(level, owner) {
            self.storager_for(owner, owner, descriptor)
        } else {
            storager::storager_for(descriptor.lifetime(), descriptor.key())
        };

        level
            .storagers
            .write()
            .entry(descriptor.id())
            .or_insert(created)
            .clone()
    }

    pub(crate) fn resolve_at(
        &self,
        level: &Arc<Level>,
        key: &Key,
        overrides: &[OverrideParameter],
    ) -> DiResult<Option<AnyArc>> {
        let Some((owner, descriptor)) = level.find(key) else {
            trace!(target: "proxy_di", service = %key, "no registration");
            return Ok(None);
        };

        let storager = self.storager_for(level, &owner, &descriptor);
        if let Some(cached) = storager.peek() {
            return Ok(Some(cached));
        }

        if !self.observers.has_observers() {
            return self.build_through(level, &owner, &descriptor, storager.as_ref(), overrides).map(Some);
        }

        let started = Instant::now();
        self.observers.resolving(key);
        let result = self.build_through(level, &owner, &descriptor, storager.as_ref(), overrides);
        match &result {
            Ok(_) => self.observers.resolved(key, started.elapsed()),
            Err(e) => self.observers.resolution_failed(key, e),
        }
        result.map(Some)
    }

    fn build_through(
        &self,
        level: &Arc<Level>,
        owner: &Arc<Level>,
        descriptor: &Descriptor,
        storager: &dyn Storager,
        overrides: &[OverrideParameter],
    ) -> DiResult<AnyArc> {
        // Must precede `acquire`: re-entering a held gate would block forever.
        let _building = BuildGuard::enter(descriptor.id(), descriptor.key(), self.config.max_depth)?;

        match storager.acquire() {
            Acquired::Ready(value) => Ok(value),
            Acquired::Vacant(ticket) => {
                let build_level = match descriptor.lifetime() {
                    Lifetime::Singleton => owner,
                    Lifetime::Scoped | Lifetime::Transient => level,
                };
                let value = self.produce(build_level, descriptor, overrides)?;
                ticket.save(value)
            }
        }
    }

    fn produce(&self, level: &Arc<Level>, descriptor: &Descriptor, overrides: &[OverrideParameter]) -> DiResult<AnyArc> {
        trace!(
            target: "proxy_di",
            service = %descriptor.key(),
            lifetime = ?descriptor.lifetime(),
            depth = level.depth,
            "building instance"
        );

        let resolver = LevelResolver { inner: self, level };
        let ctx = ResolverContext::new(&resolver);
        match descriptor.producer() {
            Producer::Factory(factory) => factory(&ctx),
            Producer::Implementation(implementation) => {
                let proxy = self.proxies.get_proxy(implementation)?;
                let built = proxy.build(&ctx, overrides)?;
                implementation.finish(built)
            }
        }
    }
}

/// Resolver bound to one level, handed to factories and proxies.
struct LevelResolver<'a> {
    inner: &'a ProviderInner,
    level: &'a Arc<Level>,
}

impl ResolverCore for LevelResolver<'_> {
    fn resolve_any(&self, key: &Key, overrides: &[OverrideParameter]) -> DiResult<Option<AnyArc>> {
        self.inner.resolve_at(self.level, key, overrides)
    }

    fn push_sync_disposer(&self, service: &'static str, hook: SyncHook) {
        self.level.push_sync_disposer(service, hook);
    }

    fn push_async_disposer(&self, service: &'static str, hook: AsyncHook) {
        self.level.push_async_disposer(service, hook);
    }
}

/// Root of a provider tree.
///
/// Resolves registrations with their lifetimes, hands out child scopes and
/// owns the type-proxy cache and its sweeper. Cloning is cheap and every
/// clone shares the same tree.
///
/// # Examples
///
/// ```
/// use proxy_di::{Descriptor, Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|r| {
///     Ok(UserService { db: r.resolve_required::<Database>()? })
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
///
/// provider
///     .register(Descriptor::instance::<u16>(Some("port"), Arc::new(8080)))
///     .unwrap();
/// assert_eq!(*provider.get_named_required::<u16>("port"), 8080);
/// ```
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry, observers: Observers, config: ContainerConfig) -> Self {
        let config = config.sanitized();
        let proxies = ProxyCache::new(config.proxy_idle_expiry());

        let sweeper = match config.sweep_interval() {
            Some(interval) => match PoolSweeper::start(interval) {
                Ok(sweeper) => {
                    sweeper.attach(proxies.pool());
                    Some(sweeper)
                }
                Err(e) => {
                    warn!(target: "proxy_di", error = %e, "running without a proxy sweeper");
                    None
                }
            },
            None => None,
        };

        debug!(
            target: "proxy_di",
            registrations = registry.len(),
            sweeper = sweeper.is_some(),
            "provider built"
        );

        Self {
            inner: Arc::new(ProviderInner {
                root: Level::root(registry),
                proxies,
                observers,
                config,
                sweeper: Mutex::new(sweeper),
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a child scope.
    ///
    /// The scope sees every registration of the provider, shares its
    /// singletons and gets its own scoped instances.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_di::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// struct RequestId(u32);
    ///
    /// let counter = Arc::new(AtomicU32::new(0));
    /// let next = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     Ok(RequestId(next.fetch_add(1, Ordering::SeqCst)))
    /// });
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>();
    /// let req2 = scope2.get_required::<RequestId>();
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone(), self.inner.root.child())
    }

    /// Registers a descriptor at the root, visible to every scope.
    ///
    /// Duplicates follow the configured `DuplicatePolicy`.
    pub fn register(&self, descriptor: Descriptor) -> DiResult<()> {
        self.inner.register_at(&self.inner.root, descriptor)
    }

    /// Snapshots of the root registrations, in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.inner.root.descriptors()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Number of type proxies currently cached.
    pub fn proxy_cache_len(&self) -> usize {
        self.inner.proxies.pool().len()
    }

    /// Evicts idle type proxies now, without waiting for the sweeper.
    pub fn sweep_proxies(&self) -> usize {
        self.inner.proxies.pool().sweep()
    }

    /// Stops the background proxy sweeper, if one is running.
    pub fn shutdown(&self) {
        if let Some(mut sweeper) = self.inner.sweeper.lock().take() {
            sweeper.shutdown();
        }
    }

    /// Runs the root's disposal hooks: async hooks first, then sync ones,
    /// each in LIFO order.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_di::{Dispose, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// struct Cache;
    /// impl Dispose for Cache {
    ///     fn dispose(&self) {}
    /// }
    ///
    /// # async fn example() {
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait_factory::<Cache, _>(|r| {
    ///     let cache = Arc::new(Cache);
    ///     r.register_disposer(cache.clone());
    ///     Ok(cache)
    /// });
    ///
    /// let provider = services.build();
    /// let _cache = provider.get_required::<Cache>();
    /// provider.dispose_all().await;
    /// # }
    /// ```
    pub async fn dispose_all(&self) {
        self.inner.root.dispose_all().await;
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl Drop for ServiceProvider {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let pending = self.inner.root.undisposed();
            if pending > 0 {
                warn!(
                    target: "proxy_di",
                    pending,
                    "ServiceProvider dropped with undisposed resources; call dispose_all().await first"
                );
            }
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key, overrides: &[OverrideParameter]) -> DiResult<Option<AnyArc>> {
        self.inner.resolve_at(&self.inner.root, key, overrides)
    }

    fn push_sync_disposer(&self, service: &'static str, hook: SyncHook) {
        self.inner.root.push_sync_disposer(service, hook);
    }

    fn push_async_disposer(&self, service: &'static str, hook: AsyncHook) {
        self.inner.root.push_async_disposer(service, hook);
    }
}

impl Resolver for ServiceProvider {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::DuplicatePolicy;
    use crate::ServiceCollection;

    fn quiet() -> ContainerConfig {
        ContainerConfig::default().with_sweep_interval(None)
    }

    #[test]
    fn singleton_registered_in_root_is_shared_with_late_scopes() {
        let mut services = ServiceCollection::new();
        services.with_config(quiet());
        services.add_singleton_factory::<String, _>(|_| Ok("shared".to_string()));
        let provider = services.build();

        let early = provider.create_scope();
        let from_scope = early.get_required::<String>();
        let from_root = provider.get_required::<String>();
        assert!(Arc::ptr_eq(&from_scope, &from_root));

        let late = early.create_scope();
        assert!(Arc::ptr_eq(&late.get_required::<String>(), &from_root));
    }

    #[test]
    fn replace_policy_swaps_descriptor_at_runtime() {
        let mut services = ServiceCollection::new();
        services.with_config(quiet().with_duplicate_policy(DuplicatePolicy::Replace));
        services.add_singleton(1u32);
        let provider = services.build();

        provider.register(Descriptor::instance::<u32>(None, Arc::new(2))).unwrap();
        assert_eq!(*provider.get_required::<u32>(), 2);
        assert_eq!(provider.descriptors().len(), 1);
    }

    #[test]
    fn storagers_are_created_once_per_level() {
        let provider = {
            let mut services = ServiceCollection::new();
            services.with_config(quiet());
            services.add_scoped_factory::<u8, _>(|_| Ok(1));
            services.build()
        };
        let inner = provider.inner();
        let (owner, descriptor) = inner.root.find(&Key::of::<u8>()).unwrap();
        let a = inner.storager_for(&inner.root, &owner, &descriptor);
        let b = inner.storager_for(&inner.root, &owner, &descriptor);
        assert!(Arc::ptr_eq(&a, &b));

        let child = inner.root.child();
        let c = inner.storager_for(&child, &owner, &descriptor);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let provider = ServiceCollection::new().build();
        provider.shutdown();
        provider.shutdown();
    }
}
