//! Caller-supplied override parameters.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::provider::ResolverContext;
use crate::registration::{erase, AnyArc};

type AccessorFn = Arc<dyn Fn(&ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync>;

/// A value that pre-empts normal resolution for one constructor parameter.
///
/// An override targets a parameter type and optionally a parameter name. Its
/// accessor runs lazily, at build time, with the resolver that is building
/// the instance. Each override is consumed at most once per build.
///
/// # Examples
///
/// ```rust
/// use proxy_di::{OverrideParameter, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// let port = OverrideParameter::value(8080u16).named("port");
/// assert_eq!(port.name(), Some("port"));
/// assert_eq!(port.target_type_name(), "u16");
///
/// let lazy = OverrideParameter::from_fn::<String, _>(|r| {
///     let base = r.resolve_required::<u16>()?;
///     Ok(Arc::new(format!("listening on {}", base)))
/// });
/// assert!(lazy.name().is_none());
/// ```
#[derive(Clone)]
pub struct OverrideParameter {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
    accessor: AccessorFn,
}

impl OverrideParameter {
    /// Overrides a reference-typed parameter with a ready instance.
    pub fn service<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        let stored = erase(value);
        Self::raw(TypeId::of::<T>(), std::any::type_name::<T>(), Arc::new(move |_| Ok(stored.clone())))
    }

    /// Overrides a value-typed parameter.
    pub fn value<V: Clone + Send + Sync + 'static>(value: V) -> Self {
        Self::raw(
            TypeId::of::<V>(),
            std::any::type_name::<V>(),
            Arc::new(move |_| Ok(erase(Arc::new(value.clone())))),
        )
    }

    /// Overrides a parameter with an accessor evaluated at build time.
    pub fn from_fn<T, F>(accessor: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::raw(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            Arc::new(move |ctx| accessor(ctx).map(erase)),
        )
    }

    fn raw(type_id: TypeId, type_name: &'static str, accessor: AccessorFn) -> Self {
        Self { type_id, type_name, name: None, accessor }
    }

    /// Restricts the override to parameters with this name.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The target parameter name, if the override declares one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The target parameter type name.
    pub fn target_type_name(&self) -> &'static str {
        self.type_name
    }

    /// The target parameter `TypeId`.
    pub fn target_type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn evaluate(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        (self.accessor)(ctx)
    }
}

impl fmt::Debug for OverrideParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideParameter")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}
