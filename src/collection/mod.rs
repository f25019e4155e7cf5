//! Service collection: the registration builder.
//!
//! Collects descriptors, observers and configuration, then builds the
//! [`ServiceProvider`]. The fluent `add_*` helpers cover the common shapes;
//! [`ServiceCollection::register`] accepts any [`Descriptor`].

use std::sync::Arc;

use tracing::debug;

use crate::blueprint::Injectable;
use crate::config::ContainerConfig;
use crate::descriptors::{Descriptor, ServiceDescriptor};
use crate::error::DiResult;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{Inserted, Registry};

/// Registration builder for a provider tree.
///
/// Registering the same (contract, name) pair twice follows the configured
/// [`DuplicatePolicy`](crate::DuplicatePolicy): by default the first
/// registration wins. Set the configuration before registering.
///
/// # Panics
///
/// The fluent `add_*` helpers panic when the policy is `Reject` and the key
/// is already registered. Use [`register`](Self::register) to handle the
/// conflict as an error instead.
///
/// # Examples
///
/// ```rust
/// use proxy_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton_trait::<dyn Greeter>(Arc::new(English))
///     .add_named_singleton("motd", "welcome".to_string())
///     .add_transient_factory::<String, _>(|r| {
///         let greeter = r.resolve_required::<dyn Greeter>()?;
///         Ok(format!("{}!", greeter.greet()))
///     });
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<String>().as_str(), "hello!");
/// assert_eq!(provider.get_named_required::<String>("motd").as_str(), "welcome");
/// ```
pub struct ServiceCollection {
    registry: Registry,
    observers: Observers,
    config: ContainerConfig,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            observers: Observers::new(),
            config: ContainerConfig::default(),
        }
    }

    /// Replaces the configuration used for later registrations and the provider.
    pub fn with_config(&mut self, config: ContainerConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Adds a descriptor, reporting a rejected duplicate as an error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use proxy_di::{ContainerConfig, Descriptor, DiError, DuplicatePolicy, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.with_config(ContainerConfig::default().with_duplicate_policy(DuplicatePolicy::Reject));
    /// services.register(Descriptor::instance::<u32>(None, Arc::new(1))).unwrap();
    ///
    /// let err = services.register(Descriptor::instance::<u32>(None, Arc::new(2))).err().unwrap();
    /// assert!(matches!(err, DiError::RegistrationConflict(_)));
    /// ```
    pub fn register(&mut self, descriptor: Descriptor) -> DiResult<&mut Self> {
        let descriptor = Arc::new(descriptor);
        let outcome = self.registry.insert(descriptor.clone(), self.config.duplicate_policy)?;
        if outcome == Inserted::Ignored {
            debug!(target: "proxy_di", service = %descriptor.key(), "duplicate registration ignored");
        }
        Ok(self)
    }

    fn push(&mut self, descriptor: Descriptor) -> &mut Self {
        if let Err(e) = self.register(descriptor) {
            panic!("{}", e);
        }
        self
    }

    // ----- Instances -----

    /// Registers a ready-made singleton value.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.push(Descriptor::instance::<T>(None, Arc::new(value)))
    }

    /// Registers a ready-made singleton value under `name`.
    pub fn add_named_singleton<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        self.push(Descriptor::instance::<T>(Some(name), Arc::new(value)))
    }

    /// Registers a ready-made singleton for contract `T`, typically a `dyn Trait`.
    pub fn add_singleton_trait<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.push(Descriptor::instance::<T>(None, value))
    }

    pub fn add_named_singleton_trait<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &str,
        value: Arc<T>,
    ) -> &mut Self {
        self.push(Descriptor::instance::<T>(Some(name), value))
    }

    // ----- Factories -----

    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_value_factory(Lifetime::Singleton, factory)
    }

    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_value_factory(Lifetime::Scoped, factory)
    }

    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_value_factory(Lifetime::Transient, factory)
    }

    fn add_value_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.push(Descriptor::factory::<T, _>(None, lifetime, move |r| factory(r).map(Arc::new)))
    }

    /// Factory for contract `T` returning a shared instance, typically `Arc<dyn Trait>`.
    pub fn add_singleton_trait_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.push(Descriptor::factory::<T, _>(None, Lifetime::Singleton, factory))
    }

    pub fn add_scoped_trait_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.push(Descriptor::factory::<T, _>(None, Lifetime::Scoped, factory))
    }

    pub fn add_transient_trait_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.push(Descriptor::factory::<T, _>(None, Lifetime::Transient, factory))
    }

    /// Factory for contract `T` under `name`, with any lifetime.
    pub fn add_named_factory<T, F>(&mut self, name: &str, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.push(Descriptor::factory::<T, _>(Some(name), lifetime, factory))
    }

    // ----- Container-built types -----

    /// Registers `I` as its own contract, built from its blueprint.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use proxy_di::{Accessibility, Blueprint, Injectable, Lifetime, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// struct Clock;
    /// struct Job { clock: Option<Arc<Clock>> }
    ///
    /// impl Injectable for Job {
    ///     fn describe(plan: &mut Blueprint<Self>) {
    ///         plan.constructor(Accessibility::Public)
    ///             .service::<Clock>("clock")
    ///             .build(|args| Ok(Job { clock: args.service(0) }));
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Clock);
    /// services.add_type::<Job>(Lifetime::Transient);
    ///
    /// let job = services.build().get_required::<Job>();
    /// assert!(job.clock.is_some());
    /// ```
    pub fn add_type<I: Injectable>(&mut self, lifetime: Lifetime) -> &mut Self {
        self.push(Descriptor::self_implementation::<I>(None, lifetime))
    }

    pub fn add_named_type<I: Injectable>(&mut self, name: &str, lifetime: Lifetime) -> &mut Self {
        self.push(Descriptor::self_implementation::<I>(Some(name), lifetime))
    }

    /// Registers contract `C` implemented by the container-built type `I`.
    ///
    /// `cast` converts the built value to the contract: `|i| i as Arc<dyn C>`.
    pub fn add_trait_type<C, I, F>(&mut self, lifetime: Lifetime, cast: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        self.push(Descriptor::implementation::<C, I, F>(None, lifetime, cast))
    }

    pub fn add_named_trait_type<C, I, F>(&mut self, name: &str, lifetime: Lifetime, cast: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        self.push(Descriptor::implementation::<C, I, F>(Some(name), lifetime, cast))
    }

    // ----- Diagnostics -----

    /// Registers an observer notified of every resolution in the tree.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Snapshots of the registrations so far, in registration order.
    pub fn get_service_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry.iter().map(|d| d.snapshot()).collect()
    }

    /// Builds the provider.
    ///
    /// Starts the background proxy sweeper unless the configuration disables it.
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.registry, self.observers, self.config)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::DuplicatePolicy;
    use crate::Resolver;

    #[test]
    fn first_registration_wins_by_default() {
        let mut services = ServiceCollection::new();
        services.add_singleton(1u32).add_singleton(2u32);
        assert_eq!(services.get_service_descriptors().len(), 1);
        assert_eq!(*services.build().get_required::<u32>(), 1);
    }

    #[test]
    fn replace_policy_keeps_last() {
        let mut services = ServiceCollection::new();
        services.with_config(ContainerConfig::default().with_duplicate_policy(DuplicatePolicy::Replace));
        services.add_singleton(1u32).add_singleton(2u32);
        assert_eq!(*services.build().get_required::<u32>(), 2);
    }

    #[test]
    #[should_panic(expected = "Registration conflict")]
    fn reject_policy_panics_in_fluent_helpers() {
        let mut services = ServiceCollection::new();
        services.with_config(ContainerConfig::default().with_duplicate_policy(DuplicatePolicy::Reject));
        services.add_singleton(1u32).add_singleton(2u32);
    }

    #[test]
    fn named_registrations_are_distinct() {
        let mut services = ServiceCollection::new();
        services.add_singleton(1u32).add_named_singleton("other", 2u32);
        let descriptors = services.get_service_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].service_name(), Some("other"));
    }
}
