//! # proxy-di
//!
//! Dependency resolution engine built around cached type construction
//! proxies, lifetime-specific storagers and a pool of shared resources.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Scoped and Transient storagers with exactly-once construction
//! - **Container-built types**: constructors, injectable members and init methods described by a [`Blueprint`]
//! - **Override parameters**: per-call constructor arguments, matched by name or type
//! - **Cycle detection**: re-entrant builds fail with the dependency path instead of deadlocking
//! - **Resource pool**: lazily built, idle-expiring cache shared across threads
//!
//! ## Quick Start
//!
//! ```rust
//! use proxy_di::{DiError, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct SmtpSettings { host: &'static str }
//! struct Mailer { settings: Arc<SmtpSettings> }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(SmtpSettings { host: "mail.internal" });
//! services.add_transient_factory::<Mailer, _>(|r| Ok(Mailer { settings: r.resolve_required()? }));
//!
//! let provider = services.build();
//! assert_eq!(provider.get_required::<Mailer>().settings.host, "mail.internal");
//!
//! // Optional lookups return None; required ones report the missing key.
//! assert!(provider.resolve::<String>().unwrap().is_none());
//! assert!(matches!(provider.resolve_required_named::<u16>("port"), Err(DiError::Unresolved(k)) if k == "u16[port]"));
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once per provider tree and shared by every scope
//! - **Scoped**: created once per scope
//! - **Transient**: created on every resolution, never cached
//!
//! ## Container-built Types
//!
//! Types implementing [`Injectable`] describe how they are built. The
//! container elects a constructor, resolves its parameters, then injects
//! marked members and calls marked methods.
//!
//! ```rust
//! use proxy_di::{Accessibility, Blueprint, Inject, Injectable, Lifetime, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! trait Repository: Send + Sync {
//!     fn table(&self) -> &str;
//! }
//!
//! struct Users;
//! impl Repository for Users {
//!     fn table(&self) -> &str { "users" }
//! }
//!
//! struct Audit;
//!
//! struct UserService {
//!     repo: Arc<dyn Repository>,
//!     audit: Option<Arc<Audit>>,
//! }
//!
//! impl Injectable for UserService {
//!     fn describe(plan: &mut Blueprint<Self>) {
//!         plan.constructor(Accessibility::Public)
//!             .service::<dyn Repository>("repo")
//!             .build(|args| Ok(UserService { repo: args.required(0)?, audit: None }));
//!         plan.property::<Audit>("audit")
//!             .inject(Inject::new())
//!             .set(|svc, audit| svc.audit = audit);
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_trait::<dyn Repository>(Arc::new(Users));
//! services.add_singleton(Audit);
//! services.add_type::<UserService>(Lifetime::Scoped);
//!
//! let provider = services.build();
//! let scope = provider.create_scope();
//! let svc = scope.get_required::<UserService>();
//! assert_eq!(svc.repo.table(), "users");
//! assert!(svc.audit.is_some());
//! ```
//!
//! ## Scoped Services
//!
//! ```rust
//! use proxy_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! let counter = Arc::new(AtomicU32::new(0));
//! let c = counter.clone();
//!
//! let mut services = ServiceCollection::new();
//! services.add_scoped_factory::<u32, _>(move |_| Ok(c.fetch_add(1, Ordering::SeqCst)));
//!
//! let provider = services.build();
//! let a = provider.create_scope();
//! let b = provider.create_scope();
//!
//! assert!(Arc::ptr_eq(&a.get_required::<u32>(), &a.get_required::<u32>()));
//! assert_ne!(*a.get_required::<u32>(), *b.get_required::<u32>());
//! ```

pub mod blueprint;
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod overrides;
pub mod pool;
pub mod provider;
pub mod proxy;
pub mod storager;
pub mod traits;

mod internal;
mod registration;

pub use blueprint::{
    Accessibility, Arguments, Blueprint, BuiltInstance, ConstructorBuilder, ConstructorInfo, Inject, Injectable,
    MemberBuilder, MemberInfo, MemberKind, MethodBuilder, MethodInfo, ParameterInfo, TypeBlueprint,
};
pub use collection::ServiceCollection;
pub use config::{ConfigSource, ConfigValue, ContainerConfig, EnvironmentConfigSource, ENV_PREFIX};
pub use descriptors::{Descriptor, ImplementationType, Producer, ServiceDescriptor};
pub use error::{DiError, DiResult};
pub use key::{key_of_type, Key};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use overrides::OverrideParameter;
pub use pool::{PoolLease, PoolSweeper, Poolable, ResourcePool, Sweep};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use proxy::TypeProxy;
pub use registration::{AnyArc, DuplicatePolicy};
pub use storager::{
    storager_for, Acquired, BuildTicket, ScopedStorager, SingletonStorager, Storager, TransientStorager,
};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
