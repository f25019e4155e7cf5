//! Child scopes of a provider tree.

use std::sync::Arc;

use tracing::{trace, warn};

use super::{Level, ServiceProvider};
use crate::descriptors::{Descriptor, ServiceDescriptor};
use crate::error::DiResult;
use crate::internal::{AsyncHook, SyncHook};
use crate::key::Key;
use crate::overrides::OverrideParameter;
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};

/// A child level of the provider tree.
///
/// # Lifetime Behavior
///
/// - **Singleton**: shared with the level that registered it, and with every
///   scope below that level
/// - **Scoped**: one instance per scope; parents, siblings and children each
///   build their own
/// - **Transient**: a fresh instance on every resolution
///
/// Registrations made on a scope are visible to that scope and its
/// descendants only, and shadow registrations of the same key further up.
///
/// # Examples
///
/// ```
/// use proxy_di::{Descriptor, Resolver, ServiceCollection};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
///
/// struct RequestId(u64);
///
/// let next = Arc::new(AtomicU64::new(0));
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<RequestId, _>(move |_| Ok(RequestId(next.fetch_add(1, Ordering::SeqCst))));
///
/// let provider = collection.build();
/// let request = provider.create_scope();
/// let nested = request.create_scope();
/// assert_eq!(request.get_required::<RequestId>().0, request.get_required::<RequestId>().0);
/// assert_ne!(request.get_required::<RequestId>().0, nested.get_required::<RequestId>().0);
///
/// request.register(Descriptor::instance::<String>(Some("tenant"), Arc::new("acme".into()))).unwrap();
/// assert!(nested.resolve_named::<String>("tenant").unwrap().is_some());
/// assert!(provider.resolve_named::<String>("tenant").unwrap().is_none());
/// ```
pub struct Scope {
    root: ServiceProvider,
    level: Arc<Level>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider, level: Arc<Level>) -> Self {
        trace!(target: "proxy_di", depth = level.depth(), "scope created");
        Self { root, level }
    }

    /// Creates a nested scope below this one.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.root.clone(), self.level.child())
    }

    /// Registers a descriptor visible to this scope and its descendants.
    pub fn register(&self, descriptor: Descriptor) -> DiResult<()> {
        self.root.inner().register_at(&self.level, descriptor)
    }

    /// Snapshots of the registrations made on this scope itself.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.level.descriptors()
    }

    /// Nesting depth: 1 for a scope created by the provider.
    pub fn depth(&self) -> usize {
        self.level.depth()
    }

    /// The provider this scope belongs to.
    pub fn provider(&self) -> &ServiceProvider {
        &self.root
    }

    /// Runs the disposal hooks registered while building this scope's
    /// instances: async hooks first, then sync ones, each in LIFO order.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_di::{Dispose, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// struct ScopedCache;
    /// impl Dispose for ScopedCache {
    ///     fn dispose(&self) {}
    /// }
    ///
    /// # async fn example() {
    /// let mut services = ServiceCollection::new();
    /// services.add_scoped_trait_factory::<ScopedCache, _>(|r| {
    ///     let cache = Arc::new(ScopedCache);
    ///     r.register_disposer(cache.clone());
    ///     Ok(cache)
    /// });
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope();
    /// let _cache = scope.get_required::<ScopedCache>();
    /// scope.dispose_all().await;
    /// # }
    /// ```
    pub async fn dispose_all(&self) {
        self.level.dispose_all().await;
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let pending = self.level.undisposed();
        if pending > 0 {
            warn!(
                target: "proxy_di",
                pending,
                depth = self.level.depth(),
                "Scope dropped with undisposed resources; call dispose_all().await first"
            );
        }
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key, overrides: &[OverrideParameter]) -> DiResult<Option<AnyArc>> {
        self.root.inner().resolve_at(&self.level, key, overrides)
    }

    fn push_sync_disposer(&self, service: &'static str, hook: SyncHook) {
        self.level.push_sync_disposer(service, hook);
    }

    fn push_async_disposer(&self, service: &'static str, hook: AsyncHook) {
        self.level.push_async_disposer(service, hook);
    }
}

impl Resolver for Scope {}
