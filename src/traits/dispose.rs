//! Cleanup hooks for container-built services.

/// Synchronous cleanup run by `dispose_all()`.
///
/// The container does not discover disposable services on its own; a
/// factory opts in by handing the instance to
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer).
/// The hook is owned by the level that owns the instance.
///
/// # Examples
///
/// ```
/// use proxy_di::{Dispose, Lifetime, Resolver, ServiceCollection};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct WriteBuffer {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for WriteBuffer {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_named_factory::<WriteBuffer, _>("audit", Lifetime::Scoped, |r| {
///     let buffer = Arc::new(WriteBuffer::default());
///     r.register_disposer(buffer.clone());
///     Ok(buffer)
/// });
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Asynchronous cleanup run by `dispose_all()`, ahead of every
/// [`Dispose`] hook of the same level.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use proxy_di::{AsyncDispose, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Upstream {
///     endpoint: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Upstream {
///     async fn dispose(&self) {
///         // close sockets, drain in-flight requests
///         let _ = &self.endpoint;
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_trait_factory::<Upstream, _>(|r| {
///     let upstream = Arc::new(Upstream { endpoint: "10.0.0.7:5432".into() });
///     r.register_async_disposer(upstream.clone());
///     Ok(upstream)
/// });
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self);
}
