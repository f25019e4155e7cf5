//! Type construction proxies.
//!
//! A [`TypeProxy`] is the cached construction plan of one concrete type: the
//! elected constructor plus the members and methods that take part in
//! injection. Proxies are computed once from the type's blueprint and kept in
//! a [`ResourcePool`]; once a type has not been built for a while its proxy
//! is evicted and simply recomputed on next use.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::blueprint::{
    Arguments, BuiltInstance, ConstructorInfo, Inject, MemberInfo, MemberKind, MethodInfo, ParameterInfo,
    ParameterKind, TypeBlueprint,
};
use crate::descriptors::ImplementationType;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::overrides::OverrideParameter;
use crate::pool::{Poolable, ResourcePool};
use crate::provider::ResolverContext;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Cached construction plan for one concrete type.
///
/// # Examples
///
/// ```
/// use proxy_di::{Accessibility, Blueprint, Injectable, TypeBlueprint, TypeProxy};
///
/// struct Report;
///
/// impl Injectable for Report {
///     fn describe(plan: &mut Blueprint<Self>) {
///         plan.constructor(Accessibility::Private)
///             .value::<u32>("pages")
///             .value::<u32>("copies")
///             .build(|_| Ok(Report));
///         plan.constructor(Accessibility::Public).build(|_| Ok(Report));
///     }
/// }
///
/// let proxy = TypeProxy::from_blueprint(TypeBlueprint::of::<Report>()).unwrap();
/// assert_eq!(proxy.constructor().accessibility(), Accessibility::Public);
/// assert_eq!(proxy.constructor().arity(), 0);
/// ```
pub struct TypeProxy {
    type_id: TypeId,
    type_name: &'static str,
    constructor: ConstructorInfo,
    fields: Vec<MemberInfo>,
    properties: Vec<MemberInfo>,
    methods: Vec<MethodInfo>,
}

impl Poolable for TypeProxy {}

impl TypeProxy {
    /// Elects a constructor and filters the injectable members.
    ///
    /// Fails with `DiError::NoUsableConstructor` for a type that declares
    /// no constructor.
    pub fn from_blueprint(blueprint: TypeBlueprint) -> DiResult<Self> {
        let type_id = blueprint.type_id();
        let type_name = blueprint.type_name();
        let (constructors, members, methods) = blueprint.into_parts();

        let constructor = elect_constructor(constructors).ok_or(DiError::NoUsableConstructor(type_name))?;

        let (fields, properties): (Vec<_>, Vec<_>) = members
            .into_iter()
            .filter(MemberInfo::is_injectable)
            .partition(|m| m.kind() == MemberKind::Field);
        let methods: Vec<_> = methods.into_iter().filter(MethodInfo::is_injectable).collect();

        trace!(
            target: "proxy_di",
            implementation = type_name,
            arity = constructor.arity(),
            fields = fields.len(),
            properties = properties.len(),
            methods = methods.len(),
            "built type proxy"
        );

        Ok(Self { type_id, type_name, constructor, fields, properties, methods })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn constructor(&self) -> &ConstructorInfo {
        &self.constructor
    }

    /// Injectable fields, in declaration order.
    pub fn fields(&self) -> &[MemberInfo] {
        &self.fields
    }

    /// Injectable properties, in declaration order.
    pub fn properties(&self) -> &[MemberInfo] {
        &self.properties
    }

    /// Injectable methods, in declaration order.
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// Builds one instance.
    ///
    /// Caller overrides apply to constructor parameters only, each consumed
    /// at most once. Any failure abandons the partly built value.
    pub(crate) fn build(&self, ctx: &ResolverContext<'_>, overrides: &[OverrideParameter]) -> DiResult<BuiltInstance> {
        let mut pending: Vec<&OverrideParameter> = overrides.iter().collect();

        let mut slots = Vec::with_capacity(self.constructor.arity());
        for param in self.constructor.parameters() {
            slots.push((param.name(), resolve_parameter(ctx, param, &mut pending)?));
        }
        let mut instance = self.constructor.construct(&Arguments::new(slots))?;

        for member in self.fields.iter().chain(self.properties.iter()) {
            let value = resolve_injected(ctx, member.type_id(), member.type_name(), member.inject())?;
            member.assign(instance.as_mut(), value.as_ref())?;
        }

        for method in &self.methods {
            let mut none = Vec::new();
            let mut slots = Vec::with_capacity(method.parameters().len());
            for param in method.parameters() {
                slots.push((param.name(), resolve_parameter(ctx, param, &mut none)?));
            }
            method.invoke(instance.as_mut(), &Arguments::new(slots))?;
        }

        Ok(instance)
    }
}

impl fmt::Debug for TypeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeProxy")
            .field("type", &self.type_name)
            .field("constructor", &self.constructor)
            .field("fields", &self.fields)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Preferred first; otherwise the most accessible group, then the most
/// parameters, then declaration order.
fn elect_constructor(constructors: Vec<ConstructorInfo>) -> Option<ConstructorInfo> {
    if let Some(preferred) = constructors.iter().position(ConstructorInfo::is_preferred) {
        return constructors.into_iter().nth(preferred);
    }

    let top = constructors.iter().map(ConstructorInfo::accessibility).max()?;
    let mut elected: Option<ConstructorInfo> = None;
    for candidate in constructors.into_iter().filter(|c| c.accessibility() == top) {
        match &elected {
            Some(current) if current.arity() >= candidate.arity() => {}
            _ => elected = Some(candidate),
        }
    }
    elected
}

/// Removes and returns the override for a slot.
///
/// An override naming this slot wins over an unnamed one of the same type;
/// overrides naming a different slot never match.
fn take_override<'o>(
    pending: &mut Vec<&'o OverrideParameter>,
    type_id: TypeId,
    slot: &str,
) -> Option<&'o OverrideParameter> {
    let named = pending
        .iter()
        .position(|o| o.target_type_id() == type_id && o.name() == Some(slot));
    let index = named.or_else(|| {
        pending
            .iter()
            .position(|o| o.target_type_id() == type_id && o.name().is_none())
    })?;
    Some(pending.remove(index))
}

fn resolve_parameter(
    ctx: &ResolverContext<'_>,
    param: &ParameterInfo,
    pending: &mut Vec<&OverrideParameter>,
) -> DiResult<Option<AnyArc>> {
    if let Some(o) = take_override(pending, param.type_id(), param.name()) {
        return o.evaluate(ctx).map(Some);
    }
    match param.kind() {
        ParameterKind::Value(default) => Ok(Some(default())),
        ParameterKind::Reference => resolve_injected(ctx, param.type_id(), param.type_name(), param.inject()),
    }
}

fn resolve_injected(
    ctx: &ResolverContext<'_>,
    type_id: TypeId,
    type_name: &'static str,
    inject: Option<&Inject>,
) -> DiResult<Option<AnyArc>> {
    match inject {
        Some(inject) => ctx.resolve_any(&Key::new(type_id, type_name, inject.shared_key()), inject.overrides()),
        None => ctx.resolve_any(&Key::new(type_id, type_name, None), &[]),
    }
}

/// Pool-backed cache of type proxies, keyed by implementation type.
pub(crate) struct ProxyCache {
    pool: Arc<ResourcePool<Arc<TypeProxy>>>,
}

impl ProxyCache {
    pub(crate) fn new(expiry: Duration) -> Self {
        Self { pool: Arc::new(ResourcePool::new("type-proxies", expiry)) }
    }

    pub(crate) fn pool(&self) -> &Arc<ResourcePool<Arc<TypeProxy>>> {
        &self.pool
    }

    /// Returns the proxy for `implementation`, building it on first use.
    pub(crate) fn get_proxy(&self, implementation: &ImplementationType) -> DiResult<Arc<TypeProxy>> {
        let type_id = implementation.type_id();
        self.pool
            .get_or_add(
                |proxy| proxy.type_id() == type_id,
                || TypeProxy::from_blueprint(implementation.blueprint()).map(Arc::new),
            )?
            .ok_or_else(|| DiError::PoolExhausted(implementation.type_name().to_string()))
    }
}
