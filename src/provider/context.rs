//! Resolver context handed to factories and override accessors.

use crate::error::DiResult;
use crate::internal::{AsyncHook, SyncHook};
use crate::key::Key;
use crate::overrides::OverrideParameter;
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};

/// What a factory sees while it builds.
///
/// Resolves on behalf of the level the instance belongs to: the registering
/// level for singletons, the requesting scope for everything else. A
/// singleton factory therefore cannot capture a scope's scoped instances,
/// and disposers it registers land on its own level.
///
/// # Examples
///
/// ```
/// use proxy_di::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Tenant(&'static str);
/// struct Invoices { tenant: Arc<Tenant>, region: Option<Arc<String>> }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<Tenant, _>(|_| Ok(Tenant("acme")));
/// services.add_scoped_factory::<Invoices, _>(|ctx| {
///     Ok(Invoices {
///         tenant: ctx.resolve_required::<Tenant>()?,
///         region: ctx.resolve_named::<String>("region")?,
///     })
/// });
///
/// let provider = services.build();
/// let invoices = provider.create_scope().get_required::<Invoices>();
/// assert_eq!(invoices.tenant.0, "acme");
/// assert!(invoices.region.is_none());
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new<T: ResolverCore>(resolver: &'a T) -> Self {
        Self { resolver }
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_any(&self, key: &Key, overrides: &[OverrideParameter]) -> DiResult<Option<AnyArc>> {
        self.resolver.resolve_any(key, overrides)
    }

    fn push_sync_disposer(&self, service: &'static str, hook: SyncHook) {
        self.resolver.push_sync_disposer(service, hook);
    }

    fn push_async_disposer(&self, service: &'static str, hook: AsyncHook) {
        self.resolver.push_async_disposer(service, hook);
    }
}

impl Resolver for ResolverContext<'_> {}
