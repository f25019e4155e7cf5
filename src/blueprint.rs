//! Explicit per-type construction blueprints.
//!
//! Rust has no runtime member discovery, so every concrete type that the
//! container builds itself describes its candidate constructors, its fields
//! and properties, and its post-construction methods through [`Injectable`].
//! The description carries the same metadata a reflective container would
//! read: accessibility, the "preferred" constructor marker, the "inject"
//! marker (with an optional key and nested overrides), writability and
//! whether a slot is reference- or value-typed.
//!
//! The [`TypeProxy`](crate::TypeProxy) elects a constructor and filters the
//! members once per type; the blueprint itself is never consulted again.
//!
//! # Examples
//!
//! ```rust
//! use proxy_di::{Accessibility, Arguments, Blueprint, Injectable, Inject};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {}
//!
//! struct Scheduler {
//!     clock: Option<Arc<dyn Clock>>,
//!     workers: usize,
//!     audit: Option<Arc<String>>,
//! }
//!
//! impl Injectable for Scheduler {
//!     fn describe(plan: &mut Blueprint<Self>) {
//!         plan.constructor(Accessibility::Public)
//!             .service::<dyn Clock>("clock")
//!             .value::<usize>("workers")
//!             .build(|args| Ok(Scheduler {
//!                 clock: args.service::<dyn Clock>(0),
//!                 workers: args.value::<usize>(1)?,
//!                 audit: None,
//!             }));
//!         plan.field::<String>("audit")
//!             .inject(Inject::new().key("audit"))
//!             .set(|this, value| this.audit = value);
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::overrides::OverrideParameter;
use crate::registration::{erase, unerase, AnyArc};

/// Boxed, not yet shared instance produced by a constructor.
pub type BuiltInstance = Box<dyn Any + Send + Sync>;

type DefaultFn = Arc<dyn Fn() -> AnyArc + Send + Sync>;
type ConstructFn = Arc<dyn Fn(&Arguments) -> DiResult<BuiltInstance> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Option<&AnyArc>) -> DiResult<()> + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), &Arguments) -> DiResult<()> + Send + Sync>;

/// Constructor accessibility, ordered from least to most accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accessibility {
    Private,
    ProtectedAndInternal,
    Internal,
    Protected,
    ProtectedOrInternal,
    Public,
}

/// The "inject" marker: resolve this slot through the container.
///
/// An optional key selects a named registration; nested overrides are
/// forwarded to the resolution of the slot's own dependencies.
#[derive(Clone, Default, Debug)]
pub struct Inject {
    key: Option<Arc<str>>,
    overrides: Vec<OverrideParameter>,
}

impl Inject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the named registration instead of the unnamed one.
    pub fn key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Forward an override to the nested resolution.
    pub fn with_override(mut self, parameter: OverrideParameter) -> Self {
        self.overrides.push(parameter);
        self
    }

    pub fn resolution_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn shared_key(&self) -> Option<Arc<str>> {
        self.key.clone()
    }

    pub fn overrides(&self) -> &[OverrideParameter] {
        &self.overrides
    }
}

#[derive(Clone)]
pub(crate) enum ParameterKind {
    /// Value-typed: falls back to the type's default
    Value(DefaultFn),
    /// Reference-typed: falls back to container resolution
    Reference,
}

/// One constructor or method parameter.
#[derive(Clone)]
pub struct ParameterInfo {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    kind: ParameterKind,
    inject: Option<Inject>,
}

impl ParameterInfo {
    fn reference<S: ?Sized + Send + Sync + 'static>(name: &'static str, inject: Option<Inject>) -> Self {
        Self {
            name,
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            kind: ParameterKind::Reference,
            inject,
        }
    }

    fn value<V: Default + Clone + Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            kind: ParameterKind::Value(Arc::new(|| erase(Arc::new(V::default())))),
            inject: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ParameterKind::Reference)
    }

    pub fn inject(&self) -> Option<&Inject> {
        self.inject.as_ref()
    }

    pub(crate) fn kind(&self) -> &ParameterKind {
        &self.kind
    }
}

impl fmt::Debug for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

/// A candidate constructor.
#[derive(Clone)]
pub struct ConstructorInfo {
    accessibility: Accessibility,
    preferred: bool,
    parameters: Vec<ParameterInfo>,
    construct: ConstructFn,
}

impl ConstructorInfo {
    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }

    pub fn is_preferred(&self) -> bool {
        self.preferred
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub(crate) fn construct(&self, args: &Arguments) -> DiResult<BuiltInstance> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("accessibility", &self.accessibility)
            .field("preferred", &self.preferred)
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
}

/// A field or property slot.
#[derive(Clone)]
pub struct MemberInfo {
    name: &'static str,
    kind: MemberKind,
    type_id: TypeId,
    type_name: &'static str,
    reference: bool,
    writable: bool,
    inject: Option<Inject>,
    setter: Option<SetterFn>,
}

impl MemberInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn inject(&self) -> Option<&Inject> {
        self.inject.as_ref()
    }

    /// Writable, reference-typed and carrying an inject marker.
    pub fn is_injectable(&self) -> bool {
        self.writable && self.reference && self.inject.is_some() && self.setter.is_some()
    }

    pub(crate) fn assign(&self, target: &mut (dyn Any + Send + Sync), value: Option<&AnyArc>) -> DiResult<()> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.kind, self.name, self.type_name)
    }
}

/// A method that may run after construction.
#[derive(Clone)]
pub struct MethodInfo {
    name: &'static str,
    parameters: Vec<ParameterInfo>,
    inject: bool,
    invoke: InvokeFn,
}

impl MethodInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn is_injectable(&self) -> bool {
        self.inject
    }

    pub(crate) fn invoke(&self, target: &mut (dyn Any + Send + Sync), args: &Arguments) -> DiResult<()> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}({:?})", self.name, self.parameters)
    }
}

/// Everything a type declares about its own construction.
pub struct TypeBlueprint {
    type_id: TypeId,
    type_name: &'static str,
    constructors: Vec<ConstructorInfo>,
    members: Vec<MemberInfo>,
    methods: Vec<MethodInfo>,
}

impl TypeBlueprint {
    /// Collects the blueprint of `T`.
    pub fn of<T: Injectable>() -> Self {
        let mut blueprint = Blueprint::<T>::new();
        T::describe(&mut blueprint);
        blueprint.plan
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub(crate) fn into_parts(self) -> (Vec<ConstructorInfo>, Vec<MemberInfo>, Vec<MethodInfo>) {
        (self.constructors, self.members, self.methods)
    }
}

impl fmt::Debug for TypeBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBlueprint")
            .field("type", &self.type_name)
            .field("constructors", &self.constructors)
            .field("members", &self.members)
            .field("methods", &self.methods)
            .finish()
    }
}

/// A concrete type the container can construct itself.
///
/// Implementations describe the type once; the container caches the
/// resulting construction plan per type.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn describe(blueprint: &mut Blueprint<Self>);
}

/// Typed builder handed to [`Injectable::describe`].
pub struct Blueprint<T> {
    plan: TypeBlueprint,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Blueprint<T> {
    fn new() -> Self {
        Self {
            plan: TypeBlueprint {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                constructors: Vec::new(),
                members: Vec::new(),
                methods: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Starts a candidate constructor.
    pub fn constructor(&mut self, accessibility: Accessibility) -> ConstructorBuilder<'_, T> {
        ConstructorBuilder {
            blueprint: self,
            accessibility,
            preferred: false,
            parameters: Vec::new(),
        }
    }

    /// Declares a reference-typed field holding an `Option<Arc<F>>`.
    pub fn field<F: ?Sized + Send + Sync + 'static>(&mut self, name: &'static str) -> MemberBuilder<'_, T, F> {
        MemberBuilder::new(self, name, MemberKind::Field)
    }

    /// Declares a reference-typed property holding an `Option<Arc<F>>`.
    pub fn property<F: ?Sized + Send + Sync + 'static>(&mut self, name: &'static str) -> MemberBuilder<'_, T, F> {
        MemberBuilder::new(self, name, MemberKind::Property)
    }

    /// Declares a value-typed field. Value members are never injected.
    pub fn value_field<V: 'static>(&mut self, name: &'static str, inject: Option<Inject>) -> &mut Self {
        self.value_member::<V>(name, MemberKind::Field, inject)
    }

    /// Declares a value-typed property. Value members are never injected.
    pub fn value_property<V: 'static>(&mut self, name: &'static str, inject: Option<Inject>) -> &mut Self {
        self.value_member::<V>(name, MemberKind::Property, inject)
    }

    fn value_member<V: 'static>(&mut self, name: &'static str, kind: MemberKind, inject: Option<Inject>) -> &mut Self {
        self.plan.members.push(MemberInfo {
            name,
            kind,
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            reference: false,
            writable: true,
            inject,
            setter: None,
        });
        self
    }

    /// Starts a method declaration.
    pub fn method(&mut self, name: &'static str) -> MethodBuilder<'_, T> {
        MethodBuilder {
            blueprint: self,
            name,
            inject: false,
            parameters: Vec::new(),
        }
    }
}

/// Builder for one candidate constructor.
#[must_use = "call `build` to add the constructor to the blueprint"]
pub struct ConstructorBuilder<'a, T> {
    blueprint: &'a mut Blueprint<T>,
    accessibility: Accessibility,
    preferred: bool,
    parameters: Vec<ParameterInfo>,
}

impl<'a, T: Send + Sync + 'static> ConstructorBuilder<'a, T> {
    /// Marks the constructor as preferred; it wins the election outright.
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    /// Reference-typed parameter resolved by contract type.
    pub fn service<S: ?Sized + Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(ParameterInfo::reference::<S>(name, None));
        self
    }

    /// Reference-typed parameter carrying an inject marker.
    pub fn service_with<S: ?Sized + Send + Sync + 'static>(mut self, name: &'static str, inject: Inject) -> Self {
        self.parameters.push(ParameterInfo::reference::<S>(name, Some(inject)));
        self
    }

    /// Value-typed parameter; defaults to `V::default()` without an override.
    pub fn value<V: Default + Clone + Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(ParameterInfo::value::<V>(name));
        self
    }

    pub fn build<F>(self, construct: F)
    where
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        let construct: ConstructFn = Arc::new(move |args| construct(args).map(|v| Box::new(v) as BuiltInstance));
        self.blueprint.plan.constructors.push(ConstructorInfo {
            accessibility: self.accessibility,
            preferred: self.preferred,
            parameters: self.parameters,
            construct,
        });
    }
}

/// Builder for a reference-typed field or property.
#[must_use = "call `set` or `read_only` to add the member to the blueprint"]
pub struct MemberBuilder<'a, T, F: ?Sized> {
    blueprint: &'a mut Blueprint<T>,
    name: &'static str,
    kind: MemberKind,
    inject: Option<Inject>,
    _member: PhantomData<fn() -> Arc<F>>,
}

impl<'a, T, F> MemberBuilder<'a, T, F>
where
    T: Send + Sync + 'static,
    F: ?Sized + Send + Sync + 'static,
{
    fn new(blueprint: &'a mut Blueprint<T>, name: &'static str, kind: MemberKind) -> Self {
        Self { blueprint, name, kind, inject: None, _member: PhantomData }
    }

    pub fn inject(mut self, inject: Inject) -> Self {
        self.inject = Some(inject);
        self
    }

    /// Writable member; `setter` receives `None` when nothing resolves.
    pub fn set<S>(self, setter: S)
    where
        S: Fn(&mut T, Option<Arc<F>>) + Send + Sync + 'static,
    {
        let setter: SetterFn = Arc::new(move |target, value| {
            let this = target
                .downcast_mut::<T>()
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))?;
            let value = match value {
                Some(any) => Some(unerase::<F>(any).ok_or(DiError::TypeMismatch(std::any::type_name::<F>()))?),
                None => None,
            };
            setter(this, value);
            Ok(())
        });
        self.push(true, Some(setter));
    }

    /// Member without a setter; never injected.
    pub fn read_only(self) {
        self.push(false, None);
    }

    fn push(self, writable: bool, setter: Option<SetterFn>) {
        self.blueprint.plan.members.push(MemberInfo {
            name: self.name,
            kind: self.kind,
            type_id: TypeId::of::<F>(),
            type_name: std::any::type_name::<F>(),
            reference: true,
            writable,
            inject: self.inject,
            setter,
        });
    }
}

/// Builder for a post-construction method.
#[must_use = "call `call` to add the method to the blueprint"]
pub struct MethodBuilder<'a, T> {
    blueprint: &'a mut Blueprint<T>,
    name: &'static str,
    inject: bool,
    parameters: Vec<ParameterInfo>,
}

impl<'a, T: Send + Sync + 'static> MethodBuilder<'a, T> {
    /// Marks the method for invocation after construction.
    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn service<S: ?Sized + Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(ParameterInfo::reference::<S>(name, None));
        self
    }

    pub fn service_with<S: ?Sized + Send + Sync + 'static>(mut self, name: &'static str, inject: Inject) -> Self {
        self.parameters.push(ParameterInfo::reference::<S>(name, Some(inject)));
        self
    }

    pub fn value<V: Default + Clone + Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(ParameterInfo::value::<V>(name));
        self
    }

    pub fn call<F>(self, body: F)
    where
        F: Fn(&mut T, &Arguments) -> DiResult<()> + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Arc::new(move |target, args| {
            let this = target
                .downcast_mut::<T>()
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))?;
            body(this, args)
        });
        self.blueprint.plan.methods.push(MethodInfo {
            name: self.name,
            parameters: self.parameters,
            inject: self.inject,
            invoke,
        });
    }
}

/// Resolved arguments for one constructor or method call, by position.
pub struct Arguments {
    slots: Vec<(&'static str, Option<AnyArc>)>,
}

impl Arguments {
    pub(crate) fn new(slots: Vec<(&'static str, Option<AnyArc>)>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Parameter name at `index`.
    pub fn name(&self, index: usize) -> Option<&'static str> {
        self.slots.get(index).map(|(name, _)| *name)
    }

    /// Reference argument; `None` when nothing resolved.
    pub fn service<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Option<Arc<S>> {
        self.slots
            .get(index)
            .and_then(|(_, value)| value.as_ref())
            .and_then(unerase::<S>)
    }

    /// Reference argument that must be present.
    pub fn required<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<S>> {
        self.service::<S>(index).ok_or_else(|| {
            let name = self.name(index).unwrap_or("<missing>");
            DiError::Unresolved(format!("{} ({})", std::any::type_name::<S>(), name))
        })
    }

    /// Value argument (override or default).
    pub fn value<V: Clone + Send + Sync + 'static>(&self, index: usize) -> DiResult<V> {
        let (name, slot) = self
            .slots
            .get(index)
            .ok_or_else(|| DiError::Unresolved(format!("argument #{}", index)))?;
        let any = slot
            .as_ref()
            .ok_or_else(|| DiError::Unresolved(format!("{} ({})", std::any::type_name::<V>(), name)))?;
        unerase::<V>(any)
            .map(|v| (*v).clone())
            .ok_or(DiError::TypeMismatch(std::any::type_name::<V>()))
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|(name, v)| (name, v.is_some())))
            .finish()
    }
}
