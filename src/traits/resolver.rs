//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::{AsyncHook, BoxFutureUnit, SyncHook};
use crate::key::Key;
use crate::overrides::OverrideParameter;
use crate::registration::{unerase, AnyArc};
use crate::traits::{AsyncDispose, Dispose};

/// Core resolver trait for object-safe service resolution.
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed generic methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves the descriptor registered under `key`.
    ///
    /// Returns `Ok(None)` when no descriptor is visible from this resolver.
    /// `overrides` pre-empt resolution of the constructor parameters of
    /// container-built types; factories ignore them.
    fn resolve_any(&self, key: &Key, overrides: &[OverrideParameter]) -> DiResult<Option<AnyArc>>;

    /// Registers a synchronous disposal hook with the owning level.
    fn push_sync_disposer(&self, service: &'static str, hook: SyncHook);

    /// Registers an asynchronous disposal hook with the owning level.
    fn push_async_disposer(&self, service: &'static str, hook: AsyncHook);
}

/// Typed resolution API.
///
/// `ServiceProvider`, `Scope` and the `ResolverContext` handed to factories
/// all implement this trait. Contracts may be concrete types or trait
/// objects; both resolve the same way.
///
/// Resolution of an unregistered contract is not an error: the plain
/// `resolve*` methods return `Ok(None)`. The `*_required` variants turn a
/// missing registration into `DiError::Unresolved`.
///
/// # Examples
///
/// ```
/// use proxy_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let provider = collection.build();
///
/// assert_eq!(*provider.get_required::<usize>(), 42);
/// let logger = provider.resolve_required::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// assert!(provider.resolve::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves contract `T`, or `None` when nothing is registered.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.resolve_with::<T>(None, &[])
    }

    /// Resolves the registration of `T` under `name`.
    fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        self.resolve_with::<T>(Some(name), &[])
    }

    /// Resolves `T` with override parameters for its constructor.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_di::{Accessibility, Blueprint, Injectable, Lifetime, OverrideParameter, Resolver, ServiceCollection};
    ///
    /// struct Endpoint { port: u16 }
    ///
    /// impl Injectable for Endpoint {
    ///     fn describe(plan: &mut Blueprint<Self>) {
    ///         plan.constructor(Accessibility::Public)
    ///             .value::<u16>("port")
    ///             .build(|args| Ok(Endpoint { port: args.value(0)? }));
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_type::<Endpoint>(Lifetime::Transient);
    /// let provider = services.build();
    ///
    /// let default = provider.resolve_required::<Endpoint>().unwrap();
    /// assert_eq!(default.port, 0);
    ///
    /// let custom = provider
    ///     .resolve_with::<Endpoint>(None, &[OverrideParameter::value(8443u16)])
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(custom.port, 8443);
    /// ```
    fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
        overrides: &[OverrideParameter],
    ) -> DiResult<Option<Arc<T>>> {
        let key = Key::of::<T>().with_name(name);
        match self.resolve_any(&key, overrides)? {
            Some(any) => unerase::<T>(&any)
                .map(Some)
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>())),
            None => Ok(None),
        }
    }

    /// Resolves `T`, failing with `DiError::Unresolved` when nothing is registered.
    fn resolve_required<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve_required_with::<T>(None, &[])
    }

    fn resolve_required_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.resolve_required_with::<T>(Some(name), &[])
    }

    fn resolve_required_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
        overrides: &[OverrideParameter],
    ) -> DiResult<Arc<T>> {
        self.resolve_with::<T>(name, overrides)?
            .ok_or_else(|| DiError::Unresolved(Key::of::<T>().with_name(name).to_string()))
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// Use this when a missing registration is a configuration bug.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not registered or its construction fails.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.resolve_required::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves the registration of `T` under `name`, panicking on failure.
    fn get_named_required<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.resolve_required_named::<T>(name)
            .unwrap_or_else(|e| panic!("Failed to resolve named {} ({}): {}", std::any::type_name::<T>(), name, e))
    }

    /// Registers a service for synchronous disposal.
    ///
    /// Hooks run in LIFO order when the owning provider or scope is disposed.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_di::{Dispose, ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct Cache;
    ///
    /// impl Dispose for Cache {
    ///     fn dispose(&self) {}
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_scoped_trait_factory::<Cache, _>(|resolver| {
    ///     let cache = Arc::new(Cache);
    ///     resolver.register_disposer(cache.clone());
    ///     Ok(cache)
    /// });
    /// ```
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_sync_disposer(std::any::type_name::<T>(), Box::new(move || service.dispose()));
    }

    /// Registers a service for asynchronous disposal.
    ///
    /// Async hooks run before sync hooks, each group in LIFO order.
    fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) {
        let hook: AsyncHook = Box::new(move || -> BoxFutureUnit {
            Box::pin(async move {
                service.dispose().await;
            })
        });
        self.push_async_disposer(std::any::type_name::<T>(), hook);
    }
}
