//! Service descriptors: what the container knows about one registration.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blueprint::{BuiltInstance, Injectable, TypeBlueprint};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::registration::{erase, AnyArc};

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type FactoryFn = Arc<dyn Fn(&ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync>;
type FinishFn = Arc<dyn Fn(BuiltInstance) -> DiResult<AnyArc> + Send + Sync>;

/// A concrete type the container constructs through its proxy.
///
/// Carries the blueprint source for the type and the conversion from a
/// freshly built value to the registered contract.
#[derive(Clone)]
pub struct ImplementationType {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> TypeBlueprint,
    finish: FinishFn,
}

impl ImplementationType {
    fn new<C, I, F>(cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        let finish: FinishFn = Arc::new(move |built: BuiltInstance| {
            let concrete = built
                .downcast::<I>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))?;
            Ok(erase::<C>(cast(Arc::new(*concrete))))
        });
        Self {
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            describe: TypeBlueprint::of::<I>,
            finish,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn blueprint(&self) -> TypeBlueprint {
        (self.describe)()
    }

    pub(crate) fn finish(&self, built: BuiltInstance) -> DiResult<AnyArc> {
        (self.finish)(built)
    }
}

impl fmt::Debug for ImplementationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImplementationType({})", self.type_name)
    }
}

/// How a descriptor produces its instances.
#[derive(Clone)]
pub enum Producer {
    /// Built by the container from the type's blueprint
    Implementation(ImplementationType),
    /// Built by a caller-supplied factory
    Factory(FactoryFn),
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Producer::Implementation(imp) => write!(f, "Implementation({})", imp.type_name()),
            Producer::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// One registration: contract key, lifetime and producer.
///
/// Descriptors are immutable once created and shared between the registry
/// and the storagers that guard them. Each carries a process-unique id that
/// identifies its storager slot and its entry on the build stack.
#[derive(Clone)]
pub struct Descriptor {
    id: u64,
    key: Key,
    lifetime: Lifetime,
    producer: Producer,
}

impl Descriptor {
    fn with_producer(key: Key, lifetime: Lifetime, producer: Producer) -> Self {
        Self {
            id: NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed),
            key,
            lifetime,
            producer,
        }
    }

    /// Contract `T` produced by a factory.
    pub fn factory<T, F>(name: Option<&str>, lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |ctx| factory(ctx).map(erase::<T>));
        Self::with_producer(Key::of::<T>().with_name(name), lifetime, Producer::Factory(factory))
    }

    /// Ready-made singleton instance of contract `T`.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(name: Option<&str>, value: Arc<T>) -> Self {
        let stored = erase(value);
        let factory: FactoryFn = Arc::new(move |_| Ok(stored.clone()));
        Self::with_producer(Key::of::<T>().with_name(name), Lifetime::Singleton, Producer::Factory(factory))
    }

    /// Contract `C` implemented by the container-built type `I`.
    ///
    /// `cast` converts the built value into the contract, typically
    /// `|i| i as Arc<dyn Contract>`.
    pub fn implementation<C, I, F>(name: Option<&str>, lifetime: Lifetime, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        Self::with_producer(
            Key::of::<C>().with_name(name),
            lifetime,
            Producer::Implementation(ImplementationType::new::<C, I, F>(cast)),
        )
    }

    /// The container-built type `I` registered as its own contract.
    pub fn self_implementation<I: Injectable>(name: Option<&str>, lifetime: Lifetime) -> Self {
        Self::implementation::<I, I, _>(name, lifetime, |i| i)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// Name of the implementation type, for container-built descriptors.
    pub fn implementation_type_name(&self) -> Option<&'static str> {
        match &self.producer {
            Producer::Implementation(imp) => Some(imp.type_name()),
            Producer::Factory(_) => None,
        }
    }

    /// Read-only snapshot for diagnostics.
    pub fn snapshot(&self) -> ServiceDescriptor {
        let (impl_type_id, impl_type_name) = match &self.producer {
            Producer::Implementation(imp) => (Some(imp.type_id()), Some(imp.type_name())),
            Producer::Factory(_) => (None, None),
        };
        ServiceDescriptor {
            key: self.key.clone(),
            lifetime: self.lifetime,
            impl_type_id,
            impl_type_name,
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("producer", &self.producer)
            .finish()
    }
}

/// Service descriptor for introspection and diagnostics
///
/// A detached copy of a registration's metadata, useful for debugging and
/// startup checks.
///
/// # Examples
///
/// ```rust
/// use proxy_di::{ServiceCollection, Lifetime};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton("config".to_string());
/// services.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger));
/// services.add_named_singleton("max_connections", 100u32);
///
/// let descriptors = services.get_service_descriptors();
/// assert_eq!(descriptors.len(), 3);
///
/// let logger = descriptors.iter().find(|d| d.type_name().contains("Logger")).unwrap();
/// assert_eq!(logger.lifetime, Lifetime::Singleton);
/// assert!(!logger.is_named());
///
/// let named = descriptors.iter().find(|d| d.is_named()).unwrap();
/// assert_eq!(named.service_name(), Some("max_connections"));
/// assert_eq!(named.type_name(), "u32");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The contract key
    pub key: Key,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Implementation type ID (container-built registrations only)
    pub impl_type_id: Option<TypeId>,
    /// Implementation type name (container-built registrations only)
    pub impl_type_name: Option<&'static str>,
}

impl ServiceDescriptor {
    /// The disambiguation name, or `None` for unnamed registrations.
    pub fn service_name(&self) -> Option<&str> {
        self.key.name()
    }

    /// The contract type name.
    pub fn type_name(&self) -> &'static str {
        self.key.type_name()
    }

    pub fn is_named(&self) -> bool {
        self.key.is_named()
    }
}
